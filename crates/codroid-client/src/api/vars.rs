//! Global and project variables.
//!
//! The controller stores every global variable value as the source text of a
//! script-language literal, so [`VarValue`] renders each kind into that text
//! before it goes into the `val` field.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value, json};

use codroid_protocol::routes::global_var as routes;

use crate::api::{Reply, send_empty};
use crate::connection::Connection;
use crate::error::{ClientError, ClientResult};
use crate::exchange::RequestOptions;
use crate::transport::Connector;

static VAR_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid variable name regex")
});

/// Keywords and built-in names of the controller's script language.
const RESERVED_WORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while", "table",
    "math", "DO", "DOGroup", "DIO", "DIOGroup", "AO", "AIO", "ModbusTCP", "setSpeedJ", "setAccJ",
    "setSpeedL", "setAccL", "setBlender", "setMoveRate", "getCoor", "getTool", "setCoor",
    "editCoor", "setTool", "editTool", "setPayload", "enableVibrationSuppression",
    "disableVibrationSuppression", "setCollisionDetectionSensitivity", "initComplianceControl",
    "enableComplianceControl", "disableComplianceControl", "forceControlZeroCalibrate",
    "setFilterPeriod", "searchSuccessed", "getJoint", "getTCP", "aposToCpos", "cposToApos",
    "cposToCpos", "posOffset", "posTrans", "coorRel", "toolRel", "getJointTorque",
    "getJointExternalTorque", "createTray", "getTrayPos", "posInverse", "distance", "interPos",
    "planeTrans", "getTrajStart", "getTrajEnd", "arrayAdd", "arraySub", "coorTrans", "movJ",
    "movL", "movC", "movCircle", "movLW", "movCW", "movTraj", "setWeave", "weaveStart",
    "weaveEnd", "setDO", "getDI", "getDO", "setDOGroup", "getDIGroup", "getDOGroup", "setAO",
    "getAI", "getAO", "getRegisterBool", "setRegisterBool", "getRegisterInt", "setRegisterInt",
    "getRegisterFloat", "setRegisterFloat", "RS485init", "RS485flush", "RS485write",
    "RS485read", "readCoils", "readDiscreteInputs", "readHoldingRegisters",
    "readInputRegisters", "writeSingleCoil", "writeSingleRegister", "writeMultipleCoils",
    "writeMultipleRegisters", "createSocketClient", "connectSocketClient",
    "writeSocketClient", "readSocketClient", "closeSocketClient", "wait", "waitCondition",
    "systemTime", "stopProject", "pauseProject", "runScript", "pauseScript", "resumeScript",
    "stopScript", "callModule", "print", "setInterruptInterval", "setInterruptCondition",
    "clearInterrupt", "strcmp", "strToNumberArray", "arrayToStr", "enableMultiWeld",
    "getCurSeam", "isMultiWeldFinished", "setMultiWeldOffset", "weldNextSeam",
    "resetMultiWeld", "searchStart", "setMasterFlag", "getOffsetValue", "search", "searchEnd",
    "searchOffset", "searchOffsetEnd", "searchError",
];

/// Returns true if `name` can be used as a global variable name.
pub fn is_valid_var_name(name: &str) -> bool {
    VAR_NAME_REGEX.is_match(name) && !RESERVED_WORDS.contains(&name)
}

fn check_var_name(name: &str) -> ClientResult<()> {
    if is_valid_var_name(name) {
        Ok(())
    } else {
        Err(ClientError::invalid_argument(format!(
            "invalid variable name: {name:?}"
        )))
    }
}

/// Value of a global variable.
#[derive(Debug, Clone, PartialEq)]
pub enum VarValue {
    /// Stored between double quotes as is. Embedded quotes are not escaped,
    /// so text containing `"` produces a literal the controller cannot parse.
    Text(String),
    Integer(i64),
    Float(f64),
    Array(Vec<Value>),
    Object(Map<String, Value>),
}

impl VarValue {
    /// Renders the value as the literal text stored in `val`.
    ///
    /// Fails for non-finite floats, which have no literal form.
    pub fn to_val_string(&self) -> ClientResult<String> {
        match self {
            Self::Text(text) => Ok(format!("\"{text}\"")),
            Self::Integer(n) => Ok(n.to_string()),
            Self::Float(f) if !f.is_finite() => Err(ClientError::invalid_argument(format!(
                "variable value {f} is not a finite number"
            ))),
            Self::Float(f) => Ok(serde_json::to_string(f)?),
            Self::Array(items) => Ok(serde_json::to_string(items)?),
            Self::Object(map) => Ok(serde_json::to_string(map)?),
        }
    }
}

impl fmt::Display for VarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_val_string() {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "<invalid>"),
        }
    }
}

impl From<&str> for VarValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for VarValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for VarValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for VarValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for VarValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Vec<Value>> for VarValue {
    fn from(value: Vec<Value>) -> Self {
        Self::Array(value)
    }
}

impl From<Map<String, Value>> for VarValue {
    fn from(value: Map<String, Value>) -> Self {
        Self::Object(value)
    }
}

/// One entry of a batch save.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalVar {
    pub name: String,
    pub value: VarValue,
    pub note: String,
}

impl GlobalVar {
    pub fn new(name: impl Into<String>, value: impl Into<VarValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            note: String::new(),
        }
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }
}

fn save_payload(vars: &[GlobalVar]) -> ClientResult<Value> {
    let mut payload = Map::new();
    for var in vars {
        check_var_name(&var.name)?;
        payload.insert(
            var.name.clone(),
            json!({ "val": var.value.to_val_string()?, "nm": var.note }),
        );
    }
    Ok(Value::Object(payload))
}

/// Reads all global variables.
pub fn get_global_vars<C: Connector>(
    conn: &mut Connection<C>,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    send_empty(conn, routes::GET_VARS, options)
}

/// Creates or overwrites one global variable.
pub fn set_global_var<C: Connector>(
    conn: &mut Connection<C>,
    name: &str,
    value: impl Into<VarValue>,
    note: &str,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    let var = GlobalVar::new(name, value).with_note(note);
    set_global_vars(conn, std::slice::from_ref(&var), options)
}

/// Creates or overwrites several global variables in one request.
///
/// Every name is validated before anything is sent.
pub fn set_global_vars<C: Connector>(
    conn: &mut Connection<C>,
    vars: &[GlobalVar],
    options: &RequestOptions,
) -> ClientResult<Reply> {
    if vars.is_empty() {
        return Err(ClientError::invalid_argument("no variables to save"));
    }
    let payload = save_payload(vars)?;
    conn.request(routes::SAVE_VARS, payload, options)
}

/// Deletes global variables by name.
pub fn remove_global_vars<C: Connector, S: AsRef<str>>(
    conn: &mut Connection<C>,
    names: &[S],
    options: &RequestOptions,
) -> ClientResult<Reply> {
    let names: Vec<&str> = names.iter().map(AsRef::as_ref).collect();
    conn.request(routes::REMOVE_VARS, json!(names), options)
}

/// Reads the variables of the running project.
pub fn get_project_vars<C: Connector>(
    conn: &mut Connection<C>,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    send_empty(conn, routes::GET_PROJECT_VAR_UPDATE, options)
}
