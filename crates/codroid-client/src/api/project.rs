//! Project execution, scripts, breakpoints and start lines.

use serde_json::{Map, Value, json};

use codroid_protocol::routes::project as routes;

use crate::api::{Reply, send_empty};
use crate::connection::Connection;
use crate::error::{ClientError, ClientResult};
use crate::exchange::RequestOptions;
use crate::transport::Connector;

/// Key of the entry-point script in a `runScript` payload.
const MAIN_SCRIPT: &str = "main";

/// A script bundle for `project/runScript`.
///
/// The main program is mandatory; threads, sub-programs and interrupt
/// handlers are added as named parts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    main: String,
    parts: Vec<(String, String)>,
    vars: Map<String, Value>,
}

impl Script {
    /// Creates a bundle with the given main program.
    pub fn new(main: impl Into<String>) -> Self {
        Self {
            main: main.into(),
            ..Self::default()
        }
    }

    /// Adds a named thread, sub-program or interrupt handler.
    #[must_use]
    pub fn with_part(mut self, name: impl Into<String>, code: impl Into<String>) -> Self {
        self.parts.push((name.into(), code.into()));
        self
    }

    /// Adds a variable visible to the script at start.
    #[must_use]
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    fn to_payload(&self) -> ClientResult<Value> {
        if self.main.trim().is_empty() {
            return Err(ClientError::invalid_argument("main program must not be empty"));
        }

        let mut scripts = Map::new();
        scripts.insert(MAIN_SCRIPT.to_string(), Value::String(self.main.clone()));
        for (name, code) in &self.parts {
            if name == MAIN_SCRIPT {
                return Err(ClientError::invalid_argument(
                    "script part must not be named \"main\"",
                ));
            }
            scripts.insert(name.clone(), Value::String(code.clone()));
        }

        Ok(json!({ "scripts": scripts, "vars": self.vars }))
    }
}

/// Runs a script bundle.
pub fn run_script<C: Connector>(
    conn: &mut Connection<C>,
    script: &Script,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    let payload = script.to_payload()?;
    conn.request(routes::RUN_SCRIPT, payload, options)
}

/// Switches the controller into remote script mode.
pub fn enter_remote_script_mode<C: Connector>(
    conn: &mut Connection<C>,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    send_empty(conn, routes::ENTER_REMOTE_SCRIPT_MODE, options)
}

/// Runs a project by id.
pub fn run<C: Connector>(
    conn: &mut Connection<C>,
    project_id: &str,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    conn.request(routes::RUN, json!({ "id": project_id }), options)
}

/// Runs the project mapped to `index` on the controller.
pub fn run_by_index<C: Connector>(
    conn: &mut Connection<C>,
    index: u32,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    conn.request(routes::RUN_BY_INDEX, json!(index), options)
}

/// Executes one step.
///
/// The first step needs the project id; later steps pass `""` to continue
/// the project already being stepped.
pub fn run_step<C: Connector>(
    conn: &mut Connection<C>,
    project_id: &str,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    conn.request(routes::RUN_STEP, json!({ "id": project_id }), options)
}

/// Pauses the running project.
pub fn pause<C: Connector>(
    conn: &mut Connection<C>,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    send_empty(conn, routes::PAUSE, options)
}

/// Resumes a paused project.
pub fn resume<C: Connector>(
    conn: &mut Connection<C>,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    send_empty(conn, routes::RESUME, options)
}

/// Stops the running project.
pub fn stop<C: Connector>(
    conn: &mut Connection<C>,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    send_empty(conn, routes::STOP, options)
}

fn breakpoint_payload(project_id: &str, lines: &[u32]) -> Value {
    let mut payload = Map::new();
    payload.insert(project_id.to_string(), json!(lines));
    Value::Object(payload)
}

/// Replaces the project's breakpoints with `lines`.
pub fn set_breakpoint<C: Connector>(
    conn: &mut Connection<C>,
    project_id: &str,
    lines: &[u32],
    options: &RequestOptions,
) -> ClientResult<Reply> {
    conn.request(
        routes::SET_BREAKPOINT,
        breakpoint_payload(project_id, lines),
        options,
    )
}

/// Adds breakpoints at `lines`.
pub fn add_breakpoint<C: Connector>(
    conn: &mut Connection<C>,
    project_id: &str,
    lines: &[u32],
    options: &RequestOptions,
) -> ClientResult<Reply> {
    conn.request(
        routes::ADD_BREAKPOINT,
        breakpoint_payload(project_id, lines),
        options,
    )
}

/// Removes breakpoints at `lines`.
pub fn remove_breakpoint<C: Connector>(
    conn: &mut Connection<C>,
    project_id: &str,
    lines: &[u32],
    options: &RequestOptions,
) -> ClientResult<Reply> {
    conn.request(
        routes::REMOVE_BREAKPOINT,
        breakpoint_payload(project_id, lines),
        options,
    )
}

/// Removes every breakpoint.
pub fn clear_breakpoint<C: Connector>(
    conn: &mut Connection<C>,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    send_empty(conn, routes::CLEAR_BREAKPOINT, options)
}

/// Makes the next run start at `line`.
pub fn set_start_line<C: Connector>(
    conn: &mut Connection<C>,
    line: u32,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    conn.request(routes::SET_START_LINE, json!(line), options)
}

/// Clears the start line set by [`set_start_line`].
pub fn clear_start_line<C: Connector>(
    conn: &mut Connection<C>,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    send_empty(conn, routes::CLEAR_START_LINE, options)
}
