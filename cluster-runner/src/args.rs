use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "cluster-runner")]
#[command(author, version, about = "Plans and deploys kubernetes clusters onto vSphere virtual machines", long_about = None)]
pub struct Cli {
    /// Verbose logging
    #[arg(long, short, action = ArgAction::SetTrue)]
    pub verbose: bool,

    /// Stack file (TOML, or YAML when ending in .yml/.yaml)
    #[arg(long, short, default_value = "stack.toml")]
    pub file: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve the cluster and print what would be deployed
    Plan,
    /// Deploy the cluster's virtual machines
    Apply,
    /// Tear the cluster down
    Destroy,
    /// Print an ansible inventory for a deployed cluster
    Inventory(InventoryArgs),
}

#[derive(Debug, Args)]
pub struct InventoryArgs {
    /// Outputs JSON written by apply, read from stdin when omitted
    #[arg(long, short)]
    pub outputs: Option<String>,

    /// Directory holding inventory.ini.j2
    #[arg(long, short, default_value = "files")]
    pub templates: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["cluster-runner", "plan"]).expect("args should parse");
        assert_eq!(cli.file, "stack.toml");
        assert!(!cli.verbose);
        assert!(matches!(cli.command, Commands::Plan));
    }

    #[test]
    fn inventory_args() {
        let cli = Cli::try_parse_from([
            "cluster-runner",
            "-v",
            "-f",
            "prod.yml",
            "inventory",
            "--outputs",
            "platform/terraform/outputs.json",
        ])
        .expect("args should parse");

        assert!(cli.verbose);
        assert_eq!(cli.file, "prod.yml");
        match cli.command {
            Commands::Inventory(args) => {
                assert_eq!(args.outputs.as_deref(), Some("platform/terraform/outputs.json"));
                assert_eq!(args.templates, "files");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["cluster-runner"]).is_err());
    }
}
