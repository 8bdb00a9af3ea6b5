//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use codroid_core::{TracingConfig, TracingOutputFormat};

use crate::api::modbus::ModbusDataType;

/// codroid - Talk to a Codroid robot controller over TCP
#[derive(Debug, Parser)]
#[command(name = "codroid")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CODROID_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output (raw requests and replies)
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Log line format on stderr
    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,

    /// Controller host name or IP address
    #[arg(long, env = "CODROID_HOST", global = true)]
    pub host: Option<String>,

    /// Controller port
    #[arg(long, env = "CODROID_PORT", global = true)]
    pub port: Option<u16>,

    /// Connect and reply timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Request id placed in the envelope
    #[arg(long, default_value_t = 1, global = true)]
    pub id: i64,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Returns the tracing setup selected by `--debug` and `--log-format`.
    pub fn tracing_config(&self) -> TracingConfig {
        match (self.debug, self.log_format) {
            (true, format) => TracingConfig::cli_debug().with_format(format.into()),
            (false, LogFormat::Json) => TracingConfig::structured(),
            (false, format) => TracingConfig::default().with_format(format.into()),
        }
    }
}

/// Log line formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One line per event
    #[default]
    Compact,
    /// Fields on their own lines
    Pretty,
    /// One JSON object per line
    Json,
}

impl From<LogFormat> for TracingOutputFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Compact => Self::Compact,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Json => Self::Json,
        }
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send a raw request and print the reply
    Send {
        /// Route, e.g. `project/run`
        route: String,

        /// JSON payload (defaults to `{}`)
        payload: Option<String>,

        /// Print the reply text as received instead of pretty JSON
        #[arg(long)]
        raw: bool,
    },

    /// Project execution and debugging
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Global and project variables
    Vars {
        #[command(subcommand)]
        action: VarsAction,
    },

    /// End-effector RS485 port
    Rs485 {
        #[command(subcommand)]
        action: Rs485Action,
    },

    /// Modbus TCP master
    Modbus {
        #[command(subcommand)]
        action: ModbusAction,
    },

    /// Robot power and mode
    Robot {
        #[command(subcommand)]
        action: RobotAction,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Project actions.
#[derive(Debug, Subcommand)]
pub enum ProjectAction {
    /// Run a project by id
    Run { project_id: String },

    /// Run the project mapped to an index
    RunIndex { index: u32 },

    /// Execute one step (omit the id to continue stepping)
    Step {
        #[arg(default_value = "")]
        project_id: String,
    },

    /// Run a script file as the main program
    RunScript {
        /// Main program file
        main: PathBuf,

        /// Extra named part as `name=path` (can be repeated)
        #[arg(long = "part", action = clap::ArgAction::Append)]
        parts: Vec<String>,

        /// Start variable as `name=json` (can be repeated)
        #[arg(long = "var", action = clap::ArgAction::Append)]
        vars: Vec<String>,
    },

    /// Switch to remote script mode
    RemoteMode,

    /// Pause the running project
    Pause,

    /// Resume a paused project
    Resume,

    /// Stop the running project
    Stop,

    /// Manage breakpoints
    Breakpoint {
        #[command(subcommand)]
        action: BreakpointAction,
    },

    /// Set the line the next run starts from
    StartLine { line: u32 },

    /// Clear the start line
    ClearStartLine,
}

/// Breakpoint actions.
#[derive(Debug, Subcommand)]
pub enum BreakpointAction {
    /// Replace the breakpoints of a project
    Set(BreakpointArgs),

    /// Add breakpoints
    Add(BreakpointArgs),

    /// Remove breakpoints
    Remove(BreakpointArgs),

    /// Remove every breakpoint
    Clear,
}

#[derive(Debug, Args)]
pub struct BreakpointArgs {
    pub project_id: String,

    /// Line numbers
    pub lines: Vec<u32>,
}

/// Variable actions.
#[derive(Debug, Subcommand)]
pub enum VarsAction {
    /// List global variables
    List,

    /// List variables of the running project
    Project,

    /// Create or overwrite a global variable
    Set {
        name: String,

        /// Value: a number, a JSON array or object, or text
        value: String,

        /// Store the value as text even if it looks like a number
        #[arg(long)]
        text: bool,

        /// Variable note
        #[arg(long, default_value = "")]
        note: String,
    },

    /// Delete global variables
    Remove {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

/// RS485 actions.
#[derive(Debug, Subcommand)]
pub enum Rs485Action {
    /// Open the port
    Init {
        #[arg(long, default_value_t = 115_200)]
        baud_rate: u32,

        #[arg(long, default_value_t = 1)]
        stop_bit: u8,

        #[arg(long, default_value_t = 8)]
        data_bit: u8,

        /// 0 none, 1 odd, 2 even
        #[arg(long, default_value_t = 0)]
        parity: u8,
    },

    /// Discard buffered input
    Flush,

    /// Read bytes
    Read {
        length: u32,

        /// Controller-side wait in milliseconds
        #[arg(long, default_value_t = crate::api::rs485::DEFAULT_READ_TIMEOUT_MS)]
        wait_ms: u32,
    },

    /// Write bytes given as hex (`0x01`, `ff`) or decimal
    Write {
        #[arg(required = true)]
        bytes: Vec<String>,
    },
}

/// Modbus TCP actions.
#[derive(Debug, Subcommand)]
pub enum ModbusAction {
    /// Register a device
    SetDevice {
        name: String,
        ip: String,
        port: u16,

        #[arg(long, default_value_t = 1)]
        slave_id: u8,

        /// Little-endian registers
        #[arg(long)]
        little_endian: bool,
    },

    /// Remove a device
    RemoveDevice { name: String },

    /// Create a polling table
    SetTable {
        device: String,
        table: String,

        /// Function code, hex (`0x03`) or decimal
        function_code: String,
        address: u16,
        count: u16,

        /// Polling period in milliseconds
        #[arg(long, default_value_t = crate::api::modbus::DEFAULT_PERIOD_MS)]
        period_ms: u32,
    },

    /// Remove a polling table
    RemoveTable { device: String, table: String },

    /// Change a table's polling period
    SetPeriod {
        device: String,
        table: String,
        period_ms: u32,
    },

    /// Name a register so scripts can use `ModbusTCP["alias"]`
    SetAlias {
        device: String,
        table: String,
        address: u16,
        alias: String,
    },

    /// Set the data type of a register range
    SetType {
        device: String,
        table: String,
        address: u16,

        /// int16, uint16, int32, uint32 or float32
        data_type: ModbusDataType,

        /// Number of registers
        count: u16,
    },

    /// Write a value in a write table
    SetValue {
        device: String,
        table: String,
        address: u16,
        #[arg(allow_negative_numbers = true)]
        value: i64,
    },

    /// Show device configuration
    Config,

    /// Show device state
    State,
}

/// Robot actions.
#[derive(Debug, Subcommand)]
pub enum RobotAction {
    /// Power on
    On,
    /// Power off
    Off,
    /// Manual mode
    Manual,
    /// Automatic mode
    Auto,
    /// Remote mode
    Remote,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_send_with_globals() {
        let cli = Cli::try_parse_from([
            "codroid",
            "--host",
            "10.0.0.5",
            "send",
            "project/run",
            r#"{"id":"p1"}"#,
            "--id",
            "7",
        ])
        .unwrap();

        assert_eq!(cli.host.as_deref(), Some("10.0.0.5"));
        assert_eq!(cli.id, 7);
        match cli.command {
            Command::Send { route, payload, raw } => {
                assert_eq!(route, "project/run");
                assert_eq!(payload.as_deref(), Some(r#"{"id":"p1"}"#));
                assert!(!raw);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_breakpoints() {
        let cli = Cli::try_parse_from(["codroid", "project", "breakpoint", "add", "p1", "3", "9"])
            .unwrap();
        match cli.command {
            Command::Project {
                action: ProjectAction::Breakpoint {
                    action: BreakpointAction::Add(args),
                },
            } => {
                assert_eq!(args.project_id, "p1");
                assert_eq!(args.lines, vec![3, 9]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn step_defaults_to_continue() {
        let cli = Cli::try_parse_from(["codroid", "project", "step"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Project {
                action: ProjectAction::Step { ref project_id }
            } if project_id.is_empty()
        ));
    }

    #[test]
    fn log_format_selects_tracing_config() {
        let cli = Cli::try_parse_from(["codroid", "robot", "on"]).unwrap();
        let config = cli.tracing_config();
        assert_eq!(config.output_format, TracingOutputFormat::Compact);
        assert_eq!(config.default_level, tracing::Level::WARN);

        let cli = Cli::try_parse_from(["codroid", "--log-format", "json", "robot", "on"]).unwrap();
        let config = cli.tracing_config();
        assert_eq!(config.output_format, TracingOutputFormat::Json);
        assert_eq!(config.default_level, tracing::Level::INFO);

        let cli =
            Cli::try_parse_from(["codroid", "robot", "on", "-v", "--log-format", "pretty"]).unwrap();
        let config = cli.tracing_config();
        assert_eq!(config.output_format, TracingOutputFormat::Pretty);
        assert_eq!(config.default_level, tracing::Level::DEBUG);
    }

    #[test]
    fn parses_modbus_data_type() {
        let cli = Cli::try_parse_from([
            "codroid", "modbus", "set-type", "plc", "holding", "51", "float32", "4",
        ])
        .unwrap();
        match cli.command {
            Command::Modbus {
                action:
                    ModbusAction::SetType {
                        data_type, count, ..
                    },
            } => {
                assert_eq!(data_type, ModbusDataType::F32);
                assert_eq!(count, 4);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(
            Cli::try_parse_from(["codroid", "modbus", "set-type", "plc", "t", "0", "bits", "1"])
                .is_err()
        );
    }

    #[test]
    fn vars_remove_requires_names() {
        assert!(Cli::try_parse_from(["codroid", "vars", "remove"]).is_err());
    }
}
