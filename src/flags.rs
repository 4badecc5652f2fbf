use clap::{Parser, ValueEnum, crate_version};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Game {
    Ck3,
    Eu4,
    Hoi4,
    Stellaris,
    Vic3,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyArg {
    Smart,
    Priority,
    Base,
}

#[derive(Parser, Debug)]
#[command(
    name = "patchgen",
    author,
    version = crate_version!(),
    about = "Generate a compatibility patch that structurally merges a base Paradox mod against one or more submods.",
    long_about = r"patchgen parses a base mod and an ordered list of submods, merges each mergeable script file with a structural rule book (accumulate lists, recurse into nested containers, replace atomic blocks on conflict), and writes the result as a standalone compatibility-patch mod directory.",
    after_help = r"EXAMPLES:
    # Merge two submods on top of a base mod, lowest priority first
    patchgen --mods base_mod --mods submod_a --mods submod_b --output out --name 'My Compat Patch'

    # List the mods that would be scanned, without writing anything
    patchgen --mods base_mod --mods submod_a --list-mods"
)]
pub struct Args {
    /// Mod directories in ascending priority (the base mod first, most
    /// important submod last). Repeat the flag once per directory.
    #[arg(long = "mods", value_name = "DIR", required = true, num_args = 1)]
    pub mods: Vec<std::path::PathBuf>,

    /// Directory the generated patch is written into.
    #[arg(long = "output", value_name = "DIR")]
    pub output: Option<std::path::PathBuf>,

    /// Name recorded in the generated descriptor.mod.
    #[arg(long = "name", value_name = "NAME")]
    pub name: Option<String>,

    /// Auto-detect installed mods from the game's launcher data.
    #[arg(long = "auto-detect")]
    pub auto_detect: bool,

    /// Target game, used only for supported_version defaults.
    #[arg(long = "game", value_enum)]
    pub game: Option<Game>,

    /// Merge strategy: `smart` is the full structural merger, `priority`
    /// and `base` are thin wrappers kept for parity with older behaviors.
    #[arg(long = "strategy", value_enum, default_value = "smart")]
    pub strategy: StrategyArg,

    /// List the mods that would be scanned and exit.
    #[arg(long = "list-mods")]
    pub list_mods: bool,

    /// List files that more than one submod changes and exit.
    #[arg(long = "list-conflicts")]
    pub list_conflicts: bool,

    /// Print per-file progress and the full statistics record.
    #[arg(long = "verbose")]
    pub verbose: bool,
}

impl Args {
    /// The base mod is the first `--mods` entry; the rest are submods in
    /// ascending priority.
    pub fn base_and_submods(&self) -> anyhow::Result<(&std::path::Path, &[std::path::PathBuf])> {
        match self.mods.split_first() {
            Some((base, rest)) => Ok((base.as_path(), rest)),
            None => anyhow::bail!("--mods requires at least a base mod directory"),
        }
    }
}
