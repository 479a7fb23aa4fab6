pub mod commands;
pub mod input;
pub mod render;
pub mod shell;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "cryptex")]
#[command(
    version,
    about = "Keep your secrets in encrypted boxes, offline.",
    long_about = "Secrets live in boxes: single files encrypted with a key derived from your \
                  password. Boxes are looked up in CRYPTEX_FOLDER (or the platform config \
                  folder) and CRYPTEX_BOX names the box used when --box is omitted."
)]
pub struct Cli {
    /// Give more information about the command execution
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which box a command works on.
#[derive(Debug, Clone, Args)]
pub struct BoxArg {
    /// Box name or path (defaults to CRYPTEX_BOX)
    #[arg(id = "box", short = 'b', long = "box", value_name = "BOX")]
    pub name: Option<String>,
}

impl BoxArg {
    pub fn locator(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a box, a secret, an item or a random password
    #[command(subcommand)]
    Create(CreateCommand),

    /// List boxes or the secrets of a box
    #[command(subcommand, visible_alias = "ls")]
    List(ListCommand),

    /// Copy a secret password (NAME) or item (NAME.ITEM) to the clipboard
    #[command(arg_required_else_help = true)]
    Get {
        /// NAME or NAME.ITEM
        reference: String,

        #[command(flatten)]
        target: BoxArg,

        /// Print the value instead of copying it
        #[arg(long, default_value_t = false)]
        stdout: bool,
    },

    /// Print the details of a secret
    #[command(arg_required_else_help = true)]
    Print {
        name: String,

        #[command(flatten)]
        target: BoxArg,

        /// Show passwords and item values in clear
        #[arg(short, long, default_value_t = false)]
        unsecure: bool,
    },

    /// Edit an existing secret
    #[command(arg_required_else_help = true)]
    Edit(EditArgs),

    /// Delete a secret or a whole box
    #[command(subcommand, visible_alias = "rm")]
    Delete(DeleteCommand),

    /// Keep a box open and run commands against it interactively
    Open {
        /// Box name or path (defaults to CRYPTEX_BOX)
        box_name: Option<String>,
    },

    /// Encrypt a file or every file in a folder, wiping the originals
    #[command(arg_required_else_help = true)]
    Encrypt { path: PathBuf },

    /// Decrypt a file or every encrypted file in a folder
    #[command(arg_required_else_help = true)]
    Decrypt { path: PathBuf },

    /// Show version, environment and boxes
    Info,
}

#[derive(Debug, Subcommand)]
pub enum CreateCommand {
    /// Create a new, empty box
    #[command(visible_alias = "bo", arg_required_else_help = true)]
    Box {
        name: String,

        /// The owner of the box
        #[arg(short, long, default_value = "")]
        owner: String,
    },

    /// Add a secret to a box; the password is asked for
    #[command(visible_alias = "sr", arg_required_else_help = true)]
    Secret(NewSecretArgs),

    /// Add an item to a secret; the value is asked for
    #[command(arg_required_else_help = true)]
    Item {
        name: String,

        /// Secret receiving the item
        #[arg(short, long)]
        secret: String,

        #[command(flatten)]
        target: BoxArg,
    },

    /// Generate a random password
    #[command(visible_aliases = ["pwd", "pass"])]
    Password {
        /// Number of characters
        #[arg(short = 'd', long, default_value_t = 10)]
        length: usize,

        /// Leave out digits
        #[arg(long, default_value_t = false)]
        no_numbers: bool,

        /// Leave out letters
        #[arg(long, default_value_t = false)]
        no_letters: bool,

        /// Leave out special characters
        #[arg(long, default_value_t = false)]
        no_special: bool,

        /// Print the password instead of copying it
        #[arg(long, default_value_t = false)]
        stdout: bool,
    },
}

#[derive(Debug, Args)]
pub struct NewSecretArgs {
    pub name: String,

    #[command(flatten)]
    pub target: BoxArg,

    /// Version label
    #[arg(long, default_value = "1.0.0")]
    pub secret_version: String,

    #[arg(short, long, default_value = "")]
    pub login: String,

    #[arg(short, long, default_value = "")]
    pub url: String,

    #[arg(short, long, default_value = "")]
    pub notes: String,

    /// Extra value stored with the secret, repeatable
    #[arg(short, long = "item", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub items: Vec<(String, String)>,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    pub name: String,

    #[command(flatten)]
    pub target: BoxArg,

    /// Rename the secret
    #[arg(long = "rename", value_name = "NEW_NAME")]
    pub new_name: Option<String>,

    /// New version label
    #[arg(long)]
    pub secret_version: Option<String>,

    #[arg(short, long)]
    pub login: Option<String>,

    #[arg(short, long)]
    pub url: Option<String>,

    #[arg(short, long)]
    pub notes: Option<String>,

    /// Ask for a new password
    #[arg(short, long, default_value_t = false)]
    pub password: bool,

    /// Add or replace an item, repeatable
    #[arg(long = "set-item", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub set_items: Vec<(String, String)>,

    /// Remove an item, repeatable
    #[arg(long = "remove-item", value_name = "KEY")]
    pub remove_items: Vec<String>,
}

impl EditArgs {
    pub fn is_empty(&self) -> bool {
        self.new_name.is_none()
            && self.secret_version.is_none()
            && self.login.is_none()
            && self.url.is_none()
            && self.notes.is_none()
            && !self.password
            && self.set_items.is_empty()
            && self.remove_items.is_empty()
    }
}

#[derive(Debug, Subcommand)]
pub enum ListCommand {
    /// List the boxes in the box folder
    #[command(visible_aliases = ["box", "bo"])]
    Boxes {
        /// Regular expression on the box name
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// List the secrets of a box
    #[command(visible_aliases = ["secret", "sr"])]
    Secrets {
        #[command(flatten)]
        target: BoxArg,

        /// Case-insensitive regular expression on the secret name
        #[arg(short, long)]
        filter: Option<String>,

        /// Show the item keys of every secret
        #[arg(short, long, default_value_t = false)]
        items: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum DeleteCommand {
    /// Delete a secret from a box
    #[command(visible_alias = "sr", arg_required_else_help = true)]
    Secret {
        name: String,

        #[command(flatten)]
        target: BoxArg,
    },

    /// Delete a whole box (the password is checked first)
    #[command(visible_alias = "bo", arg_required_else_help = true)]
    Box { name: String },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{s}'"))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
