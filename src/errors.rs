use crate::battle::state::SideId;
use schema::StatusKind;

/// Problems found while loading or validating static content and rules.
///
/// Any of these means the content data is wrong; the engine never substitutes
/// a default for an unresolvable reference.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown type name: {0}")]
    UnknownType(String),
    #[error("unknown status name: {0}")]
    UnknownStatus(String),
    #[error("status {0} is not registered")]
    UnregisteredStatus(StatusKind),
    #[error("unknown move name: {0}")]
    UnknownMove(String),
    #[error("duplicate catalog entry: {0}")]
    DuplicateEntry(String),
    #[error("invalid duration range for {kind}: {min}..={max}")]
    InvalidDuration { kind: String, min: u8, max: u8 },
    #[error("probability out of range for {field}: {value}")]
    InvalidProbability { field: String, value: f64 },
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("malformed data: {0}")]
    Malformed(String),
    #[error("failed to read {path}: {reason}")]
    Io { path: String, reason: String },
}

/// Errors surfaced while resolving a turn. Any of these aborts the whole turn;
/// the caller's battle state is left untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("no action submitted for {0}")]
    MissingAction(SideId),
    #[error("{side} has no combatant in slot {slot}")]
    InvalidCombatant { side: SideId, slot: usize },
    #[error("{0} has no able combatant on the field")]
    NoActiveCombatant(SideId),
    #[error("the battle is already over")]
    BattleOver,
    #[error("move not found: {0}")]
    MoveNotFound(String),
    #[error("invalid action: {0}")]
    InvalidAction(String),
    #[error("combatant {name} is malformed: {reason}")]
    MalformedCombatant { name: String, reason: String },
    #[error("snapshot error: {0}")]
    Snapshot(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Lookup failures that are the caller's to judge, such as a move name coming
/// from less trusted content.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("move not found: {0}")]
    MoveNotFound(String),
}

/// Result type alias for turn resolution
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type alias for content and rules loading
pub type ConfigResult<T> = Result<T, ConfigError>;

impl From<ron::error::SpannedError> for ConfigError {
    fn from(err: ron::error::SpannedError) -> Self {
        ConfigError::Malformed(err.to_string())
    }
}

impl From<LookupError> for EngineError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::MoveNotFound(name) => EngineError::MoveNotFound(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ConfigError::UnknownType("Sound".to_string()).to_string(),
            "unknown type name: Sound"
        );
        assert_eq!(
            EngineError::MissingAction(SideId::Player2).to_string(),
            "no action submitted for Player 2"
        );
    }

    #[test]
    fn test_config_error_wraps_into_engine_error() {
        let err: EngineError = ConfigError::UnknownMove("Splosh".to_string()).into();
        assert_eq!(err.to_string(), "unknown move name: Splosh");
    }

    #[test]
    fn test_lookup_error_converts() {
        let err: EngineError = LookupError::MoveNotFound("Splosh".to_string()).into();
        assert_eq!(err, EngineError::MoveNotFound("Splosh".to_string()));
    }
}
