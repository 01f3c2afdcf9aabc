pub mod docserver;

pub use docserver::{DocServer, DocServerSpec, DocServerStatus};
