use std::fmt::Write;

#[derive(Debug, Clone)]
struct OptionGuide {
    flag: &'static str,
    description: &'static str,
}

#[derive(Debug, Clone)]
struct CommandGuide {
    names: &'static [&'static str],
    summary: &'static str,
    usage: &'static [&'static str],
    options: &'static [OptionGuide],
    examples: &'static [&'static str],
}

const GLOBAL_OPTIONS: &[OptionGuide] = &[
    OptionGuide {
        flag: "-h, --help",
        description: "Show contextual help information.",
    },
    OptionGuide {
        flag: "-V, --version",
        description: "Print the cppmangle version and build metadata.",
    },
    OptionGuide {
        flag: "--log-format <fmt>",
        description: "Log output format (auto, text, json); overrides CPPMANGLE_LOG_FORMAT.",
    },
    OptionGuide {
        flag: "--log-level <lvl>",
        description: "Log verbosity (error, warn, info, debug, trace); overrides CPPMANGLE_LOG_LEVEL.",
    },
];

const COMMAND_GUIDES: &[CommandGuide] = &[
    CommandGuide {
        names: &["mangle"],
        summary: "Mangle the C++ symbols of a JSON symbol descriptor.",
        usage: &["cppmangle mangle <descriptor.json> [--target <triple>] [--format text|json]"],
        options: &[
            OptionGuide {
                flag: "-t, --target <triple>",
                description: "Target whose C++ ABI to use (defaults to the host).",
            },
            OptionGuide {
                flag: "--format <fmt>",
                description: "Output `<symbol> <mangled>` lines (text) or a JSON array (json).",
            },
        ],
        examples: &[
            "cppmangle mangle api.json",
            "cppmangle mangle api.json --target x86_64-pc-windows-msvc --format json",
        ],
    },
    CommandGuide {
        names: &["targets", "list-targets"],
        summary: "List known targets and the mangling configuration derived for each.",
        usage: &["cppmangle targets [--format text|json]"],
        options: &[OptionGuide {
            flag: "--format <fmt>",
            description: "Output a table (text) or a JSON array (json).",
        }],
        examples: &["cppmangle targets"],
    },
    CommandGuide {
        names: &["help"],
        summary: "Show general help or help for a command.",
        usage: &["cppmangle help [command]"],
        options: &[],
        examples: &["cppmangle help mangle"],
    },
    CommandGuide {
        names: &["version"],
        summary: "Print version and build metadata.",
        usage: &["cppmangle version", "cppmangle --version"],
        options: &[],
        examples: &[],
    },
];

pub(crate) fn render_general_help() -> String {
    let mut out = String::new();
    out.push_str("cppmangle – C++ ABI symbol mangler (Itanium and MSVC)\n\n");
    out.push_str("USAGE:\n  cppmangle [global options] <command> [options]\n\n");
    out.push_str("COMMANDS:\n");
    for guide in COMMAND_GUIDES {
        let canonical = guide.names[0];
        let _ = writeln!(out, "  {canonical:11} {}", guide.summary);
    }
    out.push('\n');
    out.push_str("GLOBAL OPTIONS:\n");
    for option in GLOBAL_OPTIONS {
        let _ = writeln!(out, "  {:20} {}", option.flag, option.description);
    }
    out.push('\n');
    out.push_str("Use `cppmangle help <command>` to view detailed usage and examples.");
    out.push('\n');
    out
}

pub(crate) fn render_command_help(topic: &str) -> Option<String> {
    let guide = find_guide(topic)?;
    let mut out = String::new();
    let canonical = guide.names[0];
    let _ = writeln!(out, "cppmangle {canonical} – {}", guide.summary);
    out.push('\n');

    out.push_str("USAGE:\n");
    for usage in guide.usage {
        let _ = writeln!(out, "  {usage}");
    }

    if guide.names.len() > 1 {
        out.push('\n');
        out.push_str("ALIASES:\n");
        for alias in &guide.names[1..] {
            let _ = writeln!(out, "  {alias}");
        }
    }

    if !guide.options.is_empty() {
        out.push('\n');
        out.push_str("OPTIONS:\n");
        for option in guide.options {
            let _ = writeln!(out, "  {:24} {}", option.flag, option.description);
        }
    }

    if !guide.examples.is_empty() {
        out.push('\n');
        out.push_str("EXAMPLES:\n");
        for example in guide.examples {
            let _ = writeln!(out, "  {example}");
        }
    }

    out.push('\n');
    out.push_str("All commands accept `-h`/`--help` for contextual guidance.");
    out.push('\n');
    Some(out)
}

pub(crate) fn format_unknown_topic(topic: &str) -> String {
    let mut known = COMMAND_GUIDES
        .iter()
        .map(|guide| guide.names[0])
        .collect::<Vec<_>>();
    known.sort_unstable();
    format!(
        "unknown help topic '{topic}'; available commands: {}",
        known.join(", ")
    )
}

fn find_guide(topic: &str) -> Option<&'static CommandGuide> {
    COMMAND_GUIDES.iter().find(|guide| {
        guide
            .names
            .iter()
            .any(|name| name.eq_ignore_ascii_case(topic))
    })
}
