//! Populates a tree with a few network settings and looks one of them up.
//!
//! Set `RUST_LOG=trace` to see the tree's diagnostic events.

use std::process::ExitCode;

use avl_tree::{AvlError, AvlTree};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Setting {
    key: String,
    val: String,
}

impl Setting {
    fn new(key: &str, val: &str) -> Self {
        Setting {
            key: key.to_owned(),
            val: val.to_owned(),
        }
    }
}

fn populate(tree: &mut AvlTree<Setting>) -> Result<(), AvlError<Setting>> {
    tree.insert(Setting::new("ip", "192.168.1.22"))?;
    tree.insert(Setting::new("ms_ip", "192.168.1.253"))?;
    tree.insert(Setting::new("radio_ip", "192.168.2.22"))?;
    Ok(())
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let mut tree = AvlTree::with_comparator(|a: &Setting, b: &Setting| a.key.cmp(&b.key))
        .with_destroy(|setting: Setting| tracing::trace!(key = %setting.key, "released setting"));

    if let Err(err) = populate(&mut tree) {
        eprintln!("failed to populate settings: {err}");
        return ExitCode::FAILURE;
    }

    let code = match tree.lookup(&Setting::new("ip", "")) {
        Ok(found) => {
            println!("result found!");
            println!("{}", found.val);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("lookup failed: {err}");
            ExitCode::FAILURE
        }
    };

    tree.destroy();
    code
}
