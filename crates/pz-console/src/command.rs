//! Console command parsing and execution.

use std::io::{self, Write};

use eyre::eyre;
use pz_registry::{EditSessions, RegistryError, ZoneRegistry};
use pz_storage::ZoneStore;
use pz_zone::{BlockPos, EVERYWHERE, Flag, State};

/// Editor id used for the console's own edit session.
pub const CONSOLE_EDITOR: &str = "console";

/// World new zones are created in until changed with `world`.
pub const DEFAULT_WORLD: &str = "world";

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create { name: String, parent: Option<String> },
    Remove(String),
    List,
    Info(String),
    Which(BlockPos),
    Walk { from: BlockPos, to: BlockPos },
    SetFlag { zone: String, flag: Flag, state: State },
    GetFlag { zone: String, flag: Flag },
    Move { zone: String, parent: String },
    Edit(String),
    Point { x: i32, z: i32 },
    Save,
    Reset,
    Cancel,
    Ceiling { zone: String, value: i32 },
    Floor { zone: String, value: i32 },
    Greeting { zone: String, text: Option<String> },
    Farewell { zone: String, text: Option<String> },
    World(String),
    Help,
    Quit,
}

/// Whether the console keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

const HELP: &str = "\
Commands:
  create <name> [parent]         create a zone in the current world
  rm <name>                      delete a zone, moving its children up
  ls                             list zones, parents first
  info <zone>                    show a zone
  which <x> <y> <z>              zone containing a block
  walk <x> <y> <z> <x> <y> <z>   farewell/greeting when moving between blocks
  flag <zone> <FLAG> <STATE>     set a flag (ON, OFF, INHERIT)
  get <zone> <FLAG>              effective flag state
  mv <zone> <parent>             move a zone under another parent
  edit <zone>                    start editing a zone's polygon
  point <x> <z>                  toggle a vertex in the edit selection
  save | reset | cancel          commit, clear, or drop the edit selection
  ceil <zone> <y> | floor <zone> <y>
  greet <zone> [text] | farewell <zone> [text]
  world <id>                     world for new zones
  help | quit";

/// Parse one input line. Returns `Ok(None)` for a blank line.
pub fn parse_command(line: &str) -> eyre::Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match (head.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("create", [name]) => Command::Create {
            name: (*name).to_owned(),
            parent: None,
        },
        ("create", [name, parent]) => Command::Create {
            name: (*name).to_owned(),
            parent: Some((*parent).to_owned()),
        },
        ("rm" | "delete", [name]) => Command::Remove((*name).to_owned()),
        ("ls" | "list", []) => Command::List,
        ("info", [zone]) => Command::Info((*zone).to_owned()),
        ("which", [x, y, z]) => Command::Which(block(x, y, z)?),
        ("walk", [x1, y1, z1, x2, y2, z2]) => Command::Walk {
            from: block(x1, y1, z1)?,
            to: block(x2, y2, z2)?,
        },
        ("flag", [zone, flag, state]) => Command::SetFlag {
            zone: (*zone).to_owned(),
            flag: flag.parse()?,
            state: state.parse()?,
        },
        ("get", [zone, flag]) => Command::GetFlag {
            zone: (*zone).to_owned(),
            flag: flag.parse()?,
        },
        ("mv" | "move", [zone, parent]) => Command::Move {
            zone: (*zone).to_owned(),
            parent: (*parent).to_owned(),
        },
        ("edit", [zone]) => Command::Edit((*zone).to_owned()),
        ("point", [x, z]) => Command::Point {
            x: int(x)?,
            z: int(z)?,
        },
        ("save", []) => Command::Save,
        ("reset", []) => Command::Reset,
        ("cancel", []) => Command::Cancel,
        ("ceil" | "ceiling", [zone, value]) => Command::Ceiling {
            zone: (*zone).to_owned(),
            value: int(value)?,
        },
        ("floor", [zone, value]) => Command::Floor {
            zone: (*zone).to_owned(),
            value: int(value)?,
        },
        ("greet", [zone, text @ ..]) => Command::Greeting {
            zone: (*zone).to_owned(),
            text: join(text),
        },
        ("farewell", [zone, text @ ..]) => Command::Farewell {
            zone: (*zone).to_owned(),
            text: join(text),
        },
        ("world", [id]) => Command::World((*id).to_owned()),
        ("help" | "h" | "?", _) => Command::Help,
        ("quit" | "q" | "exit", _) => Command::Quit,
        (other, _) => return Err(eyre!("unknown command or arguments: '{other}'. Type 'help' for commands.")),
    };

    Ok(Some(command))
}

fn int(s: &str) -> eyre::Result<i32> {
    s.parse().map_err(|_| eyre!("expected an integer, got '{s}'"))
}

fn coord(s: &str) -> eyre::Result<f64> {
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| eyre!("expected a coordinate, got '{s}'"))
}

/// Block at a world position; fractional coordinates round down.
fn block(x: &str, y: &str, z: &str) -> eyre::Result<BlockPos> {
    Ok(BlockPos::from_world(coord(x)?, coord(y)?, coord(z)?))
}

fn join(words: &[&str]) -> Option<String> {
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

/// Console state around a registry.
pub struct Console<S: ZoneStore> {
    registry: ZoneRegistry<S>,
    sessions: EditSessions,
    world: String,
}

impl<S: ZoneStore> Console<S> {
    pub fn new(registry: ZoneRegistry<S>) -> Self {
        Self {
            registry,
            sessions: EditSessions::new(),
            world: DEFAULT_WORLD.to_owned(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ZoneRegistry<S> {
        &self.registry
    }

    /// Parse and run one line, writing the response to `out`.
    ///
    /// Command errors are reported on `out` and do not stop the console; only
    /// failures to write to `out` are returned.
    pub fn run_line(&mut self, line: &str, out: &mut impl Write) -> io::Result<Flow> {
        let command = match parse_command(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(Flow::Continue),
            Err(e) => {
                writeln!(out, "error: {e}")?;
                return Ok(Flow::Continue);
            }
        };

        let mut reply = Vec::new();
        let result = self.execute(command, &mut reply);
        for line in &reply {
            writeln!(out, "{line}")?;
        }

        match result {
            Ok(flow) => Ok(flow),
            Err(e) => {
                if e.is_persistence() {
                    tracing::warn!("Change applied in memory but not saved: {e}");
                }
                writeln!(out, "error: {e}")?;
                Ok(Flow::Continue)
            }
        }
    }

    /// Run `command`, pushing response lines onto `reply`. Lines pushed before
    /// an error are still shown.
    fn execute(&mut self, command: Command, reply: &mut Vec<String>) -> Result<Flow, RegistryError> {
        match command {
            Command::Create { name, parent } => {
                let parent = parent.as_deref().unwrap_or(EVERYWHERE);
                let zone = self.registry.create(&name, &self.world, parent)?;
                reply.push(format!("created {} under {parent}", zone.name()));
            }
            Command::Remove(name) => {
                if self.registry.delete(&name)? {
                    reply.push(format!("deleted {name}"));
                } else {
                    reply.push(format!("no zone named {name}"));
                }
            }
            Command::List => reply.extend(self.registry.list()),
            Command::Info(name) => {
                let zone = self
                    .registry
                    .lookup(&name)
                    .ok_or_else(|| RegistryError::UnknownZone(name.clone()))?;
                reply.push(format!(
                    "{} world={} parent={} band=({}, {}) vertices={}",
                    zone.name(),
                    zone.world(),
                    zone.parent().unwrap_or("-"),
                    zone.floor(),
                    zone.ceiling(),
                    zone.polygon().len()
                ));
                for flag in Flag::ALL {
                    let effective = self.registry.flag_state(&name, flag)?;
                    reply.push(format!("  {flag}: {} ({effective})", zone.flag(flag)));
                }
            }
            Command::Which(pos) => {
                let zone = self.registry.resolve_containing(pos, &self.world);
                reply.push(zone.name().to_owned());
            }
            Command::Walk { from, to } => match self.registry.transition(from, to, &self.world) {
                Some(t) => {
                    reply.push(format!("left {} entered {}", t.left, t.entered));
                    if let Some(farewell) = t.farewell {
                        reply.push(format!("  {farewell}"));
                    }
                    if let Some(greeting) = t.greeting {
                        reply.push(format!("  {greeting}"));
                    }
                }
                None => reply.push("still in the same zone".to_owned()),
            },
            Command::SetFlag { zone, flag, state } => {
                self.registry.set_flag(&zone, flag, state)?;
                reply.push(format!("{zone}: {flag} = {state}"));
            }
            Command::GetFlag { zone, flag } => {
                let state = self.registry.flag_state(&zone, flag)?;
                reply.push(format!("{zone}: {flag} is {state}"));
            }
            Command::Move { zone, parent } => {
                self.registry.set_parent(&zone, &parent)?;
                reply.push(format!("moved {zone} under {parent}"));
            }
            Command::Edit(zone) => {
                let session = self.sessions.begin(&self.registry, CONSOLE_EDITOR, &zone)?;
                reply.push(format!("editing {} ({} vertices)", session.zone, session.points.len()));
            }
            Command::Point { x, z } => {
                let added = self.sessions.toggle_point(CONSOLE_EDITOR, x, z)?;
                let verb = if added { "added" } else { "removed" };
                reply.push(format!("{verb} ({x}, {z})"));
            }
            Command::Save => {
                let zone = self.sessions.save(&self.registry, CONSOLE_EDITOR)?;
                reply.push(format!("saved {} vertices on {}", zone.polygon().len(), zone.name()));
            }
            Command::Reset => {
                self.sessions.reset(CONSOLE_EDITOR)?;
                reply.push("selection cleared".to_owned());
            }
            Command::Cancel => {
                let session = self.sessions.cancel(CONSOLE_EDITOR)?;
                reply.push(format!("stopped editing {}", session.zone));
            }
            Command::Ceiling { zone, value } => {
                self.registry.set_ceiling(&zone, value)?;
                reply.push(format!("{zone}: ceiling = {value}"));
            }
            Command::Floor { zone, value } => {
                self.registry.set_floor(&zone, value)?;
                reply.push(format!("{zone}: floor = {value}"));
            }
            Command::Greeting { zone, text } => {
                self.registry.set_greeting(&zone, text)?;
                reply.push(format!("{zone}: greeting updated"));
            }
            Command::Farewell { zone, text } => {
                self.registry.set_farewell(&zone, text)?;
                reply.push(format!("{zone}: farewell updated"));
            }
            Command::World(id) => {
                reply.push(format!("world is now {id}"));
                self.world = id;
            }
            Command::Help => reply.push(HELP.to_owned()),
            Command::Quit => return Ok(Flow::Quit),
        }

        Ok(Flow::Continue)
    }
}
