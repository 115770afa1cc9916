mod common;

mod session;
mod watcher;
