// Prints registry stores: every store, or the one named by the parameter.
use std::fmt::Write as _;
use std::io::Write;

use crate::core::registry::{CATALOG, Store};
use crate::core::value::Slot;
use crate::plugin::{Command, Context};

pub struct KvDump;

impl Command for KvDump {
    fn name(&self) -> &str {
        "kv-dump"
    }

    fn summary(&self) -> &str {
        "print every store, or one store by name"
    }

    fn run(&self, param: &str, ctx: &mut Context<'_>) {
        let mut text = String::new();
        let result = if param.is_empty() {
            ctx.registry.iterate(CATALOG, |name, slot| {
                let _ = writeln!(text, "{name}:");
                if let Some(store) = slot.as_mut().and_then(|value| value.as_store_mut()) {
                    dump_store(&mut text, store);
                }
                text.push('\n');
            })
        } else {
            let _ = writeln!(text, "{param}:");
            ctx.registry
                .iterate(param, |key, slot| dump_entry(&mut text, key, slot))
        };

        if let Err(err) = result {
            let _ = writeln!(ctx.errors, "kv-dump: {err}");
        }
        let _ = ctx.output.write_all(text.as_bytes());
    }
}

fn dump_store(text: &mut String, store: &mut Store) {
    store.for_each(|key, slot| dump_entry(text, key, slot));
}

fn dump_entry(text: &mut String, key: &str, slot: &mut Slot) {
    match slot {
        Some(value) => {
            let _ = writeln!(text, "  {key} {}", value.describe());
        }
        None => {
            let _ = writeln!(text, "  {key} (empty)");
        }
    }
}
