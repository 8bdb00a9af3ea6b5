//! Commands that talk to the controller.
//!
//! Each invocation opens one connection, performs one exchange, prints the
//! reply and disconnects.

use std::path::Path;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::debug;

use codroid_protocol::ReplyView;

use crate::api::{self, Reply};
use crate::api::modbus::{Endian, ModbusDevice, ModbusTable};
use crate::api::project::Script;
use crate::api::rs485::{Parity, Rs485Config};
use crate::api::vars::VarValue;
use crate::cli::{
    BreakpointAction, Cli, Command, ModbusAction, ProjectAction, RobotAction, Rs485Action,
    VarsAction,
};
use crate::config::ClientConfig;
use crate::connection::{Connection, ConnectionSettings};
use crate::error::{ClientError, ClientResult};
use crate::exchange::RequestOptions;
use crate::transport::Connector;

/// What a command produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// Reply text exactly as received.
    Raw(String),
    /// Parsed reply object.
    Reply(Reply),
}

/// Merges config file values with command-line overrides.
pub fn connection_settings(cli: &Cli, config: &ClientConfig) -> ClientResult<ConnectionSettings> {
    let mut settings = config.connection_settings();
    if let Some(ref host) = cli.host {
        settings.host = host.clone();
    }
    if let Some(port) = cli.port {
        settings.port = port;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        settings.connect_timeout_ms = timeout_ms;
        settings.exchange_timeout_ms = timeout_ms;
    }
    settings.debug |= cli.debug;
    settings.validate()?;
    Ok(settings)
}

/// Connects, runs the command and prints the reply.
pub fn run(cli: &Cli, config: &ClientConfig) -> ClientResult<()> {
    let settings = connection_settings(cli, config)?;
    let mut conn = Connection::new(settings);
    conn.connect_default()?;

    let options = RequestOptions::default().with_id(cli.id);
    let result = execute(&mut conn, &cli.command, &options);
    conn.disconnect();

    print_output(&result?)
}

/// Runs one controller command over an established connection.
pub fn execute<C: Connector>(
    conn: &mut Connection<C>,
    command: &Command,
    options: &RequestOptions,
) -> ClientResult<Output> {
    debug!(?command, id = options.id, "executing command");
    let reply = match command {
        Command::Send {
            route,
            payload,
            raw,
        } => {
            let payload = parse_payload(payload.as_deref())?;
            if *raw {
                let timeout = options
                    .timeout
                    .unwrap_or_else(|| conn.settings().exchange_timeout());
                return conn
                    .exchange(options.id, route, &payload, timeout)
                    .map(Output::Raw);
            }
            conn.request(route, payload, options)?
        }
        Command::Project { action } => project(conn, action, options)?,
        Command::Vars { action } => vars(conn, action, options)?,
        Command::Rs485 { action } => rs485(conn, action, options)?,
        Command::Modbus { action } => modbus(conn, action, options)?,
        Command::Robot { action } => robot(conn, action, options)?,
        Command::Config { .. } => {
            return Err(ClientError::invalid_argument(
                "config commands do not talk to the controller",
            ));
        }
    };
    Ok(Output::Reply(reply))
}

fn project<C: Connector>(
    conn: &mut Connection<C>,
    action: &ProjectAction,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    use api::project;

    match action {
        ProjectAction::Run { project_id } => project::run(conn, project_id, options),
        ProjectAction::RunIndex { index } => project::run_by_index(conn, *index, options),
        ProjectAction::Step { project_id } => project::run_step(conn, project_id, options),
        ProjectAction::RunScript { main, parts, vars } => {
            let script = load_script(main, parts, vars)?;
            project::run_script(conn, &script, options)
        }
        ProjectAction::RemoteMode => project::enter_remote_script_mode(conn, options),
        ProjectAction::Pause => project::pause(conn, options),
        ProjectAction::Resume => project::resume(conn, options),
        ProjectAction::Stop => project::stop(conn, options),
        ProjectAction::Breakpoint { action } => match action {
            BreakpointAction::Set(args) => {
                project::set_breakpoint(conn, &args.project_id, &args.lines, options)
            }
            BreakpointAction::Add(args) => {
                project::add_breakpoint(conn, &args.project_id, &args.lines, options)
            }
            BreakpointAction::Remove(args) => {
                project::remove_breakpoint(conn, &args.project_id, &args.lines, options)
            }
            BreakpointAction::Clear => project::clear_breakpoint(conn, options),
        },
        ProjectAction::StartLine { line } => project::set_start_line(conn, *line, options),
        ProjectAction::ClearStartLine => project::clear_start_line(conn, options),
    }
}

fn vars<C: Connector>(
    conn: &mut Connection<C>,
    action: &VarsAction,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    use api::vars;

    match action {
        VarsAction::List => vars::get_global_vars(conn, options),
        VarsAction::Project => vars::get_project_vars(conn, options),
        VarsAction::Set {
            name,
            value,
            text,
            note,
        } => {
            let value = parse_var_value(value, *text)?;
            vars::set_global_var(conn, name, value, note, options)
        }
        VarsAction::Remove { names } => {
            vars::remove_global_vars(conn, names.as_slice(), options)
        }
    }
}

fn rs485<C: Connector>(
    conn: &mut Connection<C>,
    action: &Rs485Action,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    use api::rs485;

    match action {
        Rs485Action::Init {
            baud_rate,
            stop_bit,
            data_bit,
            parity,
        } => {
            let config = Rs485Config {
                baud_rate: *baud_rate,
                stop_bit: *stop_bit,
                data_bit: *data_bit,
                parity: Parity::try_from(*parity)?,
            };
            rs485::init(conn, &config, options)
        }
        Rs485Action::Flush => rs485::flush_read_buffer(conn, options),
        Rs485Action::Read { length, wait_ms } => {
            // The controller waits `wait_ms` before answering.
            let options = match options.timeout {
                Some(_) => *options,
                None => options.with_timeout(
                    conn.settings().exchange_timeout() + Duration::from_millis(u64::from(*wait_ms)),
                ),
            };
            rs485::read(conn, *length, *wait_ms, &options)
        }
        Rs485Action::Write { bytes } => {
            let data = bytes
                .iter()
                .map(|b| parse_byte(b))
                .collect::<ClientResult<Vec<u8>>>()?;
            rs485::write(conn, &data, options)
        }
    }
}

fn modbus<C: Connector>(
    conn: &mut Connection<C>,
    action: &ModbusAction,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    use api::modbus;

    match action {
        ModbusAction::SetDevice {
            name,
            ip,
            port,
            slave_id,
            little_endian,
        } => {
            let endian = if *little_endian {
                Endian::Little
            } else {
                Endian::Big
            };
            let device = ModbusDevice::new(name, ip, *port)
                .with_slave_id(*slave_id)
                .with_endian(endian);
            modbus::set_device(conn, &device, options)
        }
        ModbusAction::RemoveDevice { name } => modbus::remove_device(conn, name, options),
        ModbusAction::SetTable {
            device,
            table,
            function_code,
            address,
            count,
            period_ms,
        } => {
            let table = ModbusTable::new(
                device,
                table,
                parse_byte(function_code)?,
                *address,
                *count,
            )
            .with_period(*period_ms);
            modbus::set_table(conn, &table, options)
        }
        ModbusAction::RemoveTable { device, table } => {
            modbus::remove_table(conn, device, table, options)
        }
        ModbusAction::SetPeriod {
            device,
            table,
            period_ms,
        } => modbus::set_period(conn, device, table, *period_ms, options),
        ModbusAction::SetAlias {
            device,
            table,
            address,
            alias,
        } => modbus::set_alias(conn, device, table, *address, alias, options),
        ModbusAction::SetType {
            device,
            table,
            address,
            data_type,
            count,
        } => modbus::set_data_type(conn, device, table, *address, *data_type, *count, options),
        ModbusAction::SetValue {
            device,
            table,
            address,
            value,
        } => modbus::set_value(conn, device, table, *address, *value, options),
        ModbusAction::Config => modbus::get_config(conn, options),
        ModbusAction::State => modbus::get_state(conn, options),
    }
}

fn robot<C: Connector>(
    conn: &mut Connection<C>,
    action: &RobotAction,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    use api::robot;

    match action {
        RobotAction::On => robot::switch_on(conn, options),
        RobotAction::Off => robot::switch_off(conn, options),
        RobotAction::Manual => robot::to_manual(conn, options),
        RobotAction::Auto => robot::to_auto(conn, options),
        RobotAction::Remote => robot::to_remote(conn, options),
    }
}

/// Prints the reply and turns an `err` field into a failure.
fn print_output(output: &Output) -> ClientResult<()> {
    match output {
        Output::Raw(text) => {
            println!("{text}");
            Ok(())
        }
        Output::Reply(reply) => {
            println!("{}", serde_json::to_string_pretty(reply)?);
            match ReplyView::from_object(reply).error {
                Some(err) => Err(ClientError::Rejected(err.to_string())),
                None => Ok(()),
            }
        }
    }
}

fn parse_payload(payload: Option<&str>) -> ClientResult<Value> {
    match payload.map(str::trim) {
        None | Some("") => Ok(Value::Object(Map::new())),
        Some(text) => serde_json::from_str(text)
            .map_err(|e| ClientError::invalid_argument(format!("payload is not valid JSON: {e}"))),
    }
}

/// Interprets a command-line value: integers, then floats, then JSON arrays
/// and objects; anything else is text.
fn parse_var_value(value: &str, force_text: bool) -> ClientResult<VarValue> {
    if force_text {
        return Ok(VarValue::from(value));
    }
    if let Ok(n) = value.parse::<i64>() {
        return Ok(VarValue::Integer(n));
    }
    if let Ok(f) = value.parse::<f64>() {
        if f.is_finite() {
            return Ok(VarValue::Float(f));
        }
    }
    let trimmed = value.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        return match serde_json::from_str::<Value>(value) {
            Ok(Value::Array(items)) => Ok(VarValue::Array(items)),
            Ok(Value::Object(map)) => Ok(VarValue::Object(map)),
            _ => Err(ClientError::invalid_argument(format!(
                "{value:?} looks like JSON but does not parse; pass --text to store it as text"
            ))),
        };
    }
    Ok(VarValue::from(value))
}

/// Parses `0x1f`, `1f` style hex or, failing that, decimal.
fn parse_byte(text: &str) -> ClientResult<u8> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => text
            .parse::<u8>()
            .ok()
            .or_else(|| u8::from_str_radix(text, 16).ok()),
    };
    parsed.ok_or_else(|| ClientError::invalid_argument(format!("{text:?} is not a byte value")))
}

fn split_assignment(text: &str) -> ClientResult<(&str, &str)> {
    text.split_once('=')
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| ClientError::invalid_argument(format!("expected name=value, got {text:?}")))
}

fn read_file(path: &Path) -> ClientResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        ClientError::invalid_argument(format!("failed to read {}: {e}", path.display()))
    })
}

fn load_script(main: &Path, parts: &[String], vars: &[String]) -> ClientResult<Script> {
    let mut script = Script::new(read_file(main)?);
    for part in parts {
        let (name, path) = split_assignment(part)?;
        script = script.with_part(name, read_file(Path::new(path))?);
    }
    for var in vars {
        let (name, value) = split_assignment(var)?;
        let value: Value = serde_json::from_str(value)
            .unwrap_or_else(|_| Value::String(value.to_string()));
        script = script.with_var(name, value);
    }
    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::echo_connection;
    use clap::Parser;
    use serde_json::json;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["codroid"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn cli_overrides_config() {
        let config = ClientConfig::parse("[connection]\nhost = \"10.0.0.1\"\nport = 9100").unwrap();

        let settings = connection_settings(&parse(&["robot", "on"]), &config).unwrap();
        assert_eq!(settings.addr(), "10.0.0.1:9100");
        assert!(!settings.debug);

        let cli = parse(&["--port", "9200", "--timeout-ms", "250", "-v", "robot", "on"]);
        let settings = connection_settings(&cli, &config).unwrap();
        assert_eq!(settings.addr(), "10.0.0.1:9200");
        assert_eq!(settings.exchange_timeout_ms, 250);
        assert_eq!(settings.connect_timeout_ms, 250);
        assert!(settings.debug);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let cli = parse(&["--port", "0", "robot", "on"]);
        assert!(matches!(
            connection_settings(&cli, &ClientConfig::default()),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn send_raw_and_parsed() {
        let (mut conn, _state) = echo_connection();
        let options = RequestOptions::default().with_id(7);

        let cli = parse(&["send", "project/run", r#"{"id":"p1"}"#, "--raw"]);
        let output = execute(&mut conn, &cli.command, &options).unwrap();
        assert_eq!(
            output,
            Output::Raw(r#"{"id":7,"ty":"project/run","db":{"id":"p1"}}"#.to_string())
        );

        let cli = parse(&["send", "Robot/toAuto"]);
        match execute(&mut conn, &cli.command, &options).unwrap() {
            Output::Reply(reply) => assert_eq!(reply["db"], json!({})),
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[test]
    fn send_rejects_bad_payload_without_io() {
        let (mut conn, state) = echo_connection();
        let cli = parse(&["send", "project/run", "{oops"]);

        let err = execute(&mut conn, &cli.command, &RequestOptions::default()).unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
        assert!(state.lock().unwrap().writes.is_empty());
    }

    #[test]
    fn dispatches_subcommands() {
        let (mut conn, state) = echo_connection();
        let options = RequestOptions::default();

        let cases: [&[&str]; 7] = [
            &["project", "breakpoint", "set", "p1", "4"],
            &["vars", "set", "count", "3"],
            &["rs485", "write", "0x01", "255", "ff"],
            &["modbus", "set-table", "plc", "t", "0x10", "0", "2"],
            &["robot", "remote"],
            &["modbus", "set-alias", "plc", "t", "1", "level"],
            &["modbus", "set-type", "plc", "t", "0", "int32", "2"],
        ];
        for args in cases {
            execute(&mut conn, &parse(args).command, &options).unwrap();
        }

        let sent = state.lock().unwrap().sent();
        assert_eq!(sent[0], r#"{"id":1,"ty":"project/setBreakpoint","db":{"p1":[4]}}"#);
        assert_eq!(
            sent[1],
            r#"{"id":1,"ty":"globalVar/saveVars","db":{"count":{"val":"3","nm":""}}}"#
        );
        assert_eq!(sent[2], r#"{"id":1,"ty":"EC2RS485/write","db":[1,255,255]}"#);
        assert!(sent[3].contains(r#""functionCode":16"#));
        assert_eq!(sent[4], r#"{"id":1,"ty":"Robot/toRemote","db":{}}"#);
        assert_eq!(
            sent[5],
            r#"{"id":1,"ty":"ModbusTcp/setName","db":{"name":"plc","tableName":"t","addr":1,"aliasName":"level"}}"#
        );
        assert_eq!(
            sent[6],
            r#"{"id":1,"ty":"ModbusTcp/setType","db":{"name":"plc","tableName":"t","type":"int32","addr":0,"count":2}}"#
        );
    }

    #[test]
    fn rs485_read_extends_the_deadline() {
        let (mut conn, _state) = echo_connection();
        let cli = parse(&["rs485", "read", "8", "--wait-ms", "100"]);

        let output = execute(&mut conn, &cli.command, &RequestOptions::default()).unwrap();
        match output {
            Output::Reply(reply) => assert_eq!(reply["db"], json!({"length": 8, "timeout": 100})),
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[test]
    fn var_values_from_text() {
        assert_eq!(parse_var_value("42", false).unwrap(), VarValue::Integer(42));
        assert_eq!(parse_var_value("0.5", false).unwrap(), VarValue::Float(0.5));
        assert_eq!(
            parse_var_value("[1,2]", false).unwrap(),
            VarValue::Array(vec![json!(1), json!(2)])
        );
        assert!(matches!(
            parse_var_value(r#"{"a":1}"#, false).unwrap(),
            VarValue::Object(_)
        ));
        assert_eq!(
            parse_var_value("hello", false).unwrap(),
            VarValue::Text("hello".into())
        );
        assert_eq!(
            parse_var_value("42", true).unwrap(),
            VarValue::Text("42".into())
        );
        assert_eq!(parse_var_value("nan", false).unwrap(), VarValue::Text("nan".into()));
        assert!(parse_var_value("[1,", false).is_err());
    }

    #[test]
    fn byte_values() {
        assert_eq!(parse_byte("0x0F").unwrap(), 15);
        assert_eq!(parse_byte("16").unwrap(), 16);
        assert_eq!(parse_byte("ff").unwrap(), 255);
        assert!(parse_byte("256").is_err());
        assert!(parse_byte("zz").is_err());
    }

    #[test]
    fn script_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("main.lua");
        let worker = dir.path().join("worker.lua");
        std::fs::File::create(&main)
            .unwrap()
            .write_all(b"print(a)")
            .unwrap();
        std::fs::write(&worker, "wait(1)").unwrap();

        let script = load_script(
            &main,
            &[format!("worker={}", worker.display())],
            &["a=10".to_string(), "name=robot".to_string()],
        )
        .unwrap();

        assert_eq!(
            script,
            Script::new("print(a)")
                .with_part("worker", "wait(1)")
                .with_var("a", 10)
                .with_var("name", "robot")
        );
        assert!(load_script(&main, &["=x".to_string()], &[]).is_err());
    }

    #[test]
    fn rejected_reply_fails() {
        let mut reply = Map::new();
        reply.insert("err".into(), json!("busy"));
        assert!(matches!(
            print_output(&Output::Reply(reply)),
            Err(ClientError::Rejected(_))
        ));

        let mut reply = Map::new();
        reply.insert("db".into(), json!(true));
        print_output(&Output::Reply(reply)).unwrap();

        let mut reply = Map::new();
        reply.insert("err".into(), Value::Null);
        print_output(&Output::Reply(reply)).unwrap();
    }
}
