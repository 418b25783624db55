//! `battle-sim`: resolve a scripted battle from a RON scenario file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use battle_engine::{
    BattleRules, BattleState, Combatant, FieldState, Gender, MonsterType, MoveData,
    MoveEffectCatalog, Side, SideId, StatBlock, StatusRegistry, TurnAction, TurnEngine,
    TurnReport, TurnRng,
};
use clap::Parser;
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Resolve a scripted battle scenario turn by turn
#[derive(Parser, Debug)]
#[command(name = "battle-sim", version, about, long_about = None)]
struct Cli {
    /// RON scenario with both rosters and the actions for each turn
    scenario: PathBuf,

    /// Seed for every random roll in the battle
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Stop after this many turns even if the script goes on
    #[arg(long)]
    turns: Option<usize>,

    /// Rules file to use instead of the shipped rules
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Print each turn report as a JSON line instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Deserialize)]
struct Scenario {
    player1: Vec<Entrant>,
    player2: Vec<Entrant>,
    #[serde(default)]
    field: FieldState,
    turns: Vec<ScriptedTurn>,
}

#[derive(Debug, Deserialize)]
struct Entrant {
    name: String,
    types: Vec<MonsterType>,
    #[serde(default = "default_level")]
    level: u8,
    #[serde(default)]
    gender: Option<Gender>,
    stats: StatBlock,
    #[serde(default)]
    moves: Vec<MoveData>,
}

#[derive(Debug, Deserialize)]
struct ScriptedTurn {
    player1: TurnAction,
    player2: TurnAction,
}

fn default_level() -> u8 {
    50
}

impl Entrant {
    fn into_combatant(self) -> Combatant {
        let combatant = Combatant::new(self.name, self.types, self.level, self.stats)
            .with_moves(self.moves);
        match self.gender {
            Some(gender) => combatant.with_gender(gender),
            None => combatant,
        }
    }
}

impl Scenario {
    fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        ron::from_str(&source).with_context(|| format!("parsing scenario {}", path.display()))
    }

    fn initial_state(&mut self) -> Result<BattleState> {
        let team = |entrants: &mut Vec<Entrant>| -> Vec<Combatant> {
            entrants.drain(..).map(Entrant::into_combatant).collect()
        };
        let state =
            BattleState::new(Side::new(team(&mut self.player1)), Side::new(team(&mut self.player2)))
                .with_field(self.field.clone());
        state.validate().context("scenario rosters are invalid")?;
        Ok(state)
    }
}

fn print_report(report: &TurnReport, state: &BattleState, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
        return Ok(());
    }
    for line in report.events.iter().filter_map(|event| event.format(state)) {
        println!("{line}");
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut scenario = Scenario::load(&cli.scenario)?;

    let rules = match &cli.rules {
        Some(path) => BattleRules::load(path)
            .with_context(|| format!("loading rules {}", path.display()))?,
        None => BattleRules::standard()?,
    };
    let engine = TurnEngine::new(
        rules,
        StatusRegistry::standard()?,
        MoveEffectCatalog::standard()?,
    );

    let mut state = scenario.initial_state()?;
    let mut rng = TurnRng::from_seed_u64(cli.seed);
    let limit = cli.turns.unwrap_or(scenario.turns.len());
    info!(seed = cli.seed, turns = limit, "starting simulation");

    for scripted in scenario.turns.into_iter().take(limit) {
        if state.outcome.is_over() {
            break;
        }
        let actions = [
            (SideId::Player1, scripted.player1),
            (SideId::Player2, scripted.player2),
        ];
        let report = engine
            .resolve_turn(&mut state, &actions, &mut rng)
            .with_context(|| format!("resolving turn {}", state.turn_number))?;
        print_report(&report, &state, cli.json)?;
    }

    info!(outcome = ?state.outcome, turns = state.turn_number - 1, "simulation finished");
    Ok(())
}
