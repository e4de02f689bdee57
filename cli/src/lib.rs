//! Command-line surface for codeseek: `index`, `search`, `status`, `clear`.

mod codebase_cmd;

pub use codebase_cmd::{
    ClearArgs, CodebaseCommand, CodeseekCli, IndexArgs, SearchArgs, StatusArgs,
};
