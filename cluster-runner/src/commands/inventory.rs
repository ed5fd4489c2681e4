use anyhow::Result;
use common::exit;
use tokio::{
    fs,
    io::{self, AsyncReadExt},
};
use topology::{cloud_init::FileTemplates, inventory::Inventory, StackOutputs};

use crate::args::InventoryArgs;

async fn read_outputs(args: &InventoryArgs) -> Result<String> {
    match &args.outputs {
        Some(file) => match fs::read_to_string(file).await {
            Ok(s) => Ok(s),
            Err(err) => exit!(err, "Could not read outputs file {}", file),
        },
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).await?;
            Ok(buf)
        }
    }
}

pub async fn inventory(args: &InventoryArgs) -> Result<()> {
    let outputs: StackOutputs = match serde_json::from_str(&read_outputs(args).await?) {
        Ok(o) => o,
        Err(err) => exit!(err, "Could not parse cluster outputs"),
    };

    let rendered = Inventory::from_output(&outputs.cluster)
        .render(&FileTemplates::new(&args.templates))?;
    print!("{rendered}");
    Ok(())
}
