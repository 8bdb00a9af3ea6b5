//! Route names understood by the controller, grouped by namespace.

/// Project and script execution.
pub mod project {
    pub const RUN_SCRIPT: &str = "project/runScript";
    pub const ENTER_REMOTE_SCRIPT_MODE: &str = "project/enterRemoteScriptMode";
    pub const RUN: &str = "project/run";
    pub const RUN_BY_INDEX: &str = "project/runByIndex";
    pub const RUN_STEP: &str = "project/runStep";
    pub const PAUSE: &str = "project/pause";
    pub const RESUME: &str = "project/resume";
    pub const STOP: &str = "project/stop";
    pub const SET_BREAKPOINT: &str = "project/setBreakpoint";
    pub const ADD_BREAKPOINT: &str = "project/addBreakpoint";
    pub const REMOVE_BREAKPOINT: &str = "project/removeBreakpoint";
    pub const CLEAR_BREAKPOINT: &str = "project/clearBreakpoint";
    pub const SET_START_LINE: &str = "project/setStartLine";
    pub const CLEAR_START_LINE: &str = "project/clearStartLine";
}

/// Global and project variables.
pub mod global_var {
    pub const GET_VARS: &str = "globalVar/getVars";
    pub const SAVE_VARS: &str = "globalVar/saveVars";
    pub const REMOVE_VARS: &str = "globalVar/removeVars";
    pub const GET_PROJECT_VAR_UPDATE: &str = "globalVar/GetProjectVarUpdate";
}

/// RS485 serial port on the end effector.
pub mod rs485 {
    pub const INIT: &str = "EC2RS485/init";
    pub const FLUSH_READ_BUFFER: &str = "EC2RS485/flushReadBuffer";
    pub const READ: &str = "EC2RS485/read";
    pub const WRITE: &str = "EC2RS485/write";
}

/// Modbus TCP master devices and tables.
pub mod modbus_tcp {
    pub const SET_DEVICE: &str = "ModbusTcp/setDevice";
    pub const REMOVE_DEVICE: &str = "ModbusTcp/removeDevice";
    pub const SET_TABLE: &str = "ModbusTcp/setTable";
    pub const REMOVE_TABLE: &str = "ModbusTcp/removeTable";
    pub const SET_PERIOD: &str = "ModbusTcp/setPeriod";
    pub const SET_NAME: &str = "ModbusTcp/setName";
    pub const SET_TYPE: &str = "ModbusTcp/setType";
    pub const SET_VALUE: &str = "ModbusTcp/setVal";
    pub const GET_CONFIG: &str = "ModbusTcp/getConfig";
    pub const GET_STATE: &str = "ModbusTcp/getState";
}

/// Robot power and operating mode.
pub mod robot {
    pub const SWITCH_ON: &str = "Robot/switchOn";
    pub const SWITCH_OFF: &str = "Robot/switchOff";
    pub const TO_MANUAL: &str = "Robot/toManual";
    pub const TO_AUTO: &str = "Robot/toAuto";
    pub const TO_REMOTE: &str = "Robot/toRemote";
}
