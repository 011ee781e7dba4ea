/// Error code registry for SciTrace
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 2000-2999: Dataset errors
/// - 4000-4999: Command execution errors
/// - 6000-6999: Revision and restoration errors
/// - 9000-9999: Other errors
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_PARSE_ERROR: u16 = 1007;

    // Dataset errors (2000-2999)
    pub const DATASET_INVALID: u16 = 2001;
    pub const DATASET_EXISTS: u16 = 2002;
    pub const DATASET_STAGE_NOT_FOUND: u16 = 2003;
    pub const DATASET_FILE_NOT_FOUND: u16 = 2004;

    // Execution errors (4000-4999)
    pub const EXEC_GENERIC: u16 = 4000;
    pub const EXEC_COMMAND_NOT_FOUND: u16 = 4001;
    pub const EXEC_TIMEOUT: u16 = 4002;
    pub const EXEC_SUBPROCESS_FAILED: u16 = 4003;
    pub const EXEC_OUTPUT_ERROR: u16 = 4008;

    // Revision errors (6000-6999)
    pub const REVISION_NOT_FOUND: u16 = 6001;
    pub const REVISION_FILE_MISSING: u16 = 6002;
    pub const RESTORE_VERIFICATION_FAILED: u16 = 6003;
    pub const REVISION_BINARY_CONTENT: u16 = 6004;

    // Other errors (9000-9999)
    pub const OTHER_IO: u16 = 9001;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        1000 => "Generic configuration error",
        1001 => "Configuration file not found",
        1007 => "Failed to parse configuration",

        2001 => "Dataset directory is missing or lacks .git/.datalad",
        2002 => "A dataset already exists at the target path",
        2003 => "Stage directory not found in dataset",
        2004 => "File not found in the working tree",

        4000 => "Generic execution error",
        4001 => "Executable not found on PATH",
        4002 => "Command exceeded its timeout",
        4003 => "Command exited with a non-zero status",
        4008 => "Unexpected command output",

        6001 => "Revision does not exist",
        6002 => "File does not exist in the requested revision",
        6003 => "Restored file is missing from the working tree",
        6004 => "File content in the revision is binary",

        9001 => "Filesystem error",

        _ => "Unknown error code",
    }
}
