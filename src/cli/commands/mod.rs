pub(crate) mod common;

mod mangle;
mod targets;

use super::CommandDescriptor;

const COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor {
        name: "mangle",
        aliases: &[],
        parser: mangle::parse,
    },
    CommandDescriptor {
        name: "targets",
        aliases: &["list-targets"],
        parser: targets::parse,
    },
];

pub(crate) fn descriptors() -> &'static [CommandDescriptor] {
    COMMANDS
}
