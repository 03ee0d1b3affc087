use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use relgraph::command::{self, CommandNode};
use relgraph::{Command, CommandRegistry, CommandSpec, Result, TuplePath, diagnostics};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "relgraph")]
#[command(about = "Build and run nested command graphs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the command tree built from a spec file.
    Plan {
        #[arg(long)]
        spec: String,

        #[command(flatten)]
        registry: RegistryArgs,
    },
    /// Build the command tree and run it against an input tuple.
    /// Every command echoes the input routed to it.
    Run {
        #[arg(long)]
        spec: String,

        #[arg(long)]
        input: String,

        #[command(flatten)]
        registry: RegistryArgs,
    },
}

#[derive(Args)]
struct RegistryArgs {
    /// Relations with registered commands. Defaults to every relation named in the spec file.
    #[arg(long, value_delimiter = ',')]
    relations: Vec<String>,

    /// Command names registered for each relation.
    #[arg(long, value_delimiter = ',', default_value = "create,update,delete")]
    commands: Vec<String>,

    /// Dot-separated tuple path the root node is nested under.
    #[arg(long, value_delimiter = '.')]
    prefix: Vec<String>,
}

#[derive(Debug)]
struct EchoCommand {
    relation: String,
    name: String,
}

impl Command for EchoCommand {
    fn relation(&self) -> &str {
        &self.relation
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_composite(&self) -> bool {
        true
    }

    fn call(&self, input: &Value, _parent: Option<&Value>) -> Result<Value> {
        Ok(input.clone())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Plan { spec, registry } => {
            let root = load_graph(&spec, &registry)?;
            print_tree(&root, 0);
        }
        Commands::Run {
            spec,
            input,
            registry,
        } => {
            let root = load_graph(&spec, &registry)?;

            let text = std::fs::read_to_string(&input)
                .with_context(|| diagnostics::error_message(format!("read input file {}", input)))?;
            let tuple: Value = serde_json::from_str(&text)
                .with_context(|| diagnostics::error_message(format!("parse input file {}", input)))?;

            let outcome = root.call(&tuple)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}

fn load_graph(path: &str, args: &RegistryArgs) -> Result<CommandNode> {
    let text = std::fs::read_to_string(path)
        .with_context(|| diagnostics::error_message(format!("read spec file {}", path)))?;
    let spec = CommandSpec::from_json_str(&text)
        .with_context(|| diagnostics::error_message(format!("parse spec file {}", path)))?;

    let registry = echo_registry(&spec, args);
    let prefix: TuplePath = args.prefix.iter().collect();
    let root = command::build(&registry, &spec, &prefix)?;
    Ok(root)
}

fn echo_registry(spec: &CommandSpec, args: &RegistryArgs) -> CommandRegistry {
    let relations: BTreeSet<String> = if args.relations.is_empty() {
        let mut named = BTreeSet::new();
        collect_relations(spec, &mut named);
        named
    } else {
        args.relations.iter().cloned().collect()
    };

    let mut registry = CommandRegistry::new();
    for relation in &relations {
        for name in &args.commands {
            registry.register(Arc::new(EchoCommand {
                relation: relation.clone(),
                name: name.clone(),
            }));
        }
    }
    registry
}

fn collect_relations(spec: &CommandSpec, out: &mut BTreeSet<String>) {
    out.insert(spec.relation.relation().to_string());
    for child in &spec.children {
        collect_relations(child, out);
    }
}

fn print_tree(node: &CommandNode, depth: usize) {
    let id = node.id();
    println!("{}{}.{}  [{}]", "  ".repeat(depth), id.relation, id.name, id.path);
    for child in node.children() {
        print_tree(child, depth + 1);
    }
}
