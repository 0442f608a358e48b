//! Build-time bot registration.
//!
//! Every bot crate contributes a static [`BotDescriptor`] to the
//! [`BOT_REGISTRY`] distributed slice with [`register_bot!`]. A manifest
//! names the `kind` it wants and the registry resolves it here; nothing is
//! guessed from type names at runtime.
//!
//! Linking a crate is enough to register its bots. Binaries that do not
//! otherwise reference a bot crate should `use bots_crate as _;` so the
//! linker keeps it.

use linkme::distributed_slice;
use serde_json::{Map, Value};

use crate::bot::BoxedBot;
use crate::config::BotConfig;
use crate::env::BotEnv;
use crate::error::BuildResult;

/// Factory that constructs a bot from its build context.
pub type BotFactory = fn(&BuildContext<'_>) -> BuildResult<BoxedBot>;

/// Static metadata for one registrable bot kind.
#[derive(Clone, Copy)]
pub struct BotDescriptor {
    /// Kind named by manifests, e.g. `math`.
    pub kind: &'static str,
    /// Rust type implementing the bot.
    pub type_name: &'static str,
    /// One-line description for listings.
    pub description: &'static str,
    /// Constructor.
    pub create: BotFactory,
}

impl std::fmt::Debug for BotDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotDescriptor")
            .field("kind", &self.kind)
            .field("type_name", &self.type_name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// All bot descriptors linked into the binary.
#[distributed_slice]
pub static BOT_REGISTRY: [BotDescriptor];

/// Returns every registered descriptor ordered by kind.
pub fn descriptors() -> Vec<&'static BotDescriptor> {
    let mut all: Vec<_> = BOT_REGISTRY.iter().collect();
    all.sort_by(|a, b| a.kind.cmp(b.kind).then(a.type_name.cmp(b.type_name)));
    all
}

/// Returns every descriptor registered under `kind`.
///
/// More than one entry means the kind is ambiguous; callers must not pick one.
pub fn lookup(kind: &str) -> Vec<&'static BotDescriptor> {
    BOT_REGISTRY.iter().filter(|d| d.kind == kind).collect()
}

// =============================================================================
// Build Context
// =============================================================================

/// Everything a factory receives: manifest overrides and the shared environment.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    overrides: &'a Map<String, Value>,
    env: &'a BotEnv,
}

impl<'a> BuildContext<'a> {
    /// Creates a build context.
    pub fn new(overrides: &'a Map<String, Value>, env: &'a BotEnv) -> Self {
        Self { overrides, env }
    }

    /// Merges the manifest overrides over `defaults`.
    pub fn config(&self, defaults: BotConfig) -> BuildResult<BotConfig> {
        defaults.merged(self.overrides)
    }

    /// Raw manifest overrides.
    pub fn overrides(&self) -> &'a Map<String, Value> {
        self.overrides
    }

    /// Shared credentials and settings.
    pub fn env(&self) -> &'a BotEnv {
        self.env
    }
}

/// Registers a bot kind in [`BOT_REGISTRY`].
///
/// ```rust,ignore
/// register_bot! {
///     static MATH_BOT = {
///         kind: "math",
///         ty: MathBot,
///         description: "Arithmetic and statistics",
///         create: MathBot::create,
///     }
/// }
/// ```
#[macro_export]
macro_rules! register_bot {
    (
        $(#[$meta:meta])*
        static $name:ident = {
            kind: $kind:expr,
            ty: $ty:ty,
            description: $description:expr,
            create: $create:expr $(,)?
        }
    ) => {
        $(#[$meta])*
        #[$crate::linkme::distributed_slice($crate::BOT_REGISTRY)]
        #[linkme(crate = $crate::linkme)]
        static $name: $crate::BotDescriptor = $crate::BotDescriptor {
            kind: $kind,
            type_name: ::core::stringify!($ty),
            description: $description,
            create: $create,
        };
    };
}
