use std::path::{Path, PathBuf};

use anyhow::Result;
use common::{
    command::{command, Stage},
    exit,
    provider::{Declaration, Runtime, DESTROY, SETUP},
};
use tokio::fs;
use tracing::info;

pub const VARS_FILE: &str = "vars.tfvars";

const INIT: Stage = Stage {
    ongoing: "Initializing terraform module",
    failure: "Could not initialize terraform module",
    success: "Terraform module initialized",
};

/// Hands the declaration to a terraform module as the `vm_map` variable
pub struct Terraform {
    workdir: PathBuf,
}

impl Terraform {
    pub fn new(workdir: impl AsRef<Path>) -> Self {
        Self {
            workdir: workdir.as_ref().to_path_buf(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }
}

/// Every declared virtual machine keyed by its resource name
pub fn get_vm_map(declaration: &Declaration) -> Result<hcl::Map<String, hcl::Value>> {
    let mut vm_map: hcl::Map<String, hcl::Value> = hcl::Map::new();
    for (name, vm) in declaration.resources() {
        vm_map.insert(name.to_owned(), hcl::to_value(vm)?);
    }

    let mut vars = hcl::Map::new();
    vars.insert("vm_map".to_owned(), hcl::Value::Object(vm_map));
    Ok(vars)
}

pub fn render_vars(declaration: &Declaration) -> Result<String> {
    Ok(hcl::to_string(&get_vm_map(declaration)?)?)
}

#[async_trait::async_trait]
impl Runtime for Terraform {
    async fn apply(&self, declaration: &Declaration, verbose: bool) -> Result<()> {
        if !self.workdir.is_dir() {
            exit!(
                "missing terraform module",
                "Terraform working directory {} does not exist",
                self.workdir.display()
            );
        }

        let vars = self.workdir.join(VARS_FILE);
        fs::write(&vars, render_vars(declaration)?).await?;
        info!(
            "wrote {} virtual machines to {}",
            declaration.len(),
            vars.display()
        );

        command("terraform", &["init", "-input=false"], verbose, INIT, &self.workdir).await?;
        command(
            "terraform",
            &["apply", "--auto-approve", "-var-file=vars.tfvars"],
            verbose,
            SETUP,
            &self.workdir,
        )
        .await
    }

    async fn destroy(&self, verbose: bool) -> Result<()> {
        // The module needs the variables it was applied with, even empty ones
        let vars = self.workdir.join(VARS_FILE);
        if !vars.exists() {
            fs::write(&vars, render_vars(&Declaration::new())?).await?;
        }

        command(
            "terraform",
            &["destroy", "--auto-approve", "-var-file=vars.tfvars"],
            verbose,
            DESTROY,
            &self.workdir,
        )
        .await
    }

    fn name(&self) -> String {
        "terraform".to_owned()
    }
}
