//! Default config file template.

/// Generate the default TOML config content with comments.
pub(super) fn default_config_toml() -> String {
    r##"# ptyrelay configuration
# Only override what you want to change -- missing fields use defaults.

[server]
# host = "0.0.0.0"
# port = 8000

[cli]
# command = "copilot"        # program started for each session
# args = []
# encoding = "utf-8"         # only utf-8 is supported
# default_cols = 120         # 1-1000
# default_rows = 40          # 1-1000
# working_directory = "/path/to/project"
# output_queue_capacity = 1024   # chunks buffered before the reader waits

[cli.env]
# NO_COLOR = "1"

[logging]
# level = "INFO"             # DEBUG, INFO, WARNING, ERROR
"##
    .to_string()
}
