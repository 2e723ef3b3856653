// Library root
// -----------
// This crate exposes a small library surface for the CLI. The binary
// (`main.rs`) uses these modules to implement the interactive tool.
//
// Module responsibilities:
// - `config`: Command line flags and environment variables.
// - `device`: Finds the OP-1 volume among the mounted drives.
// - `archive`: Copies and deletes `.aif` files between the device and the
//   local project folders.
// - `prompt`: Single keystroke and line input, with project name completion.
// - `ui`: The action menu and the backup, restore and erase flows.
pub mod archive;
pub mod config;
pub mod device;
pub mod prompt;
pub mod ui;
