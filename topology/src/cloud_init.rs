//! Boot configuration payloads for node virtual machines
//!
//! Templates use Jinja syntax and are rendered with strict undefined handling,
//! so a template referencing a variable that is not provided fails instead of
//! rendering an empty string. Rendered payloads are base64 encoded, the
//! encoding the guest's cloud-init datasource expects in `guestinfo`.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use base64::{engine::general_purpose::STANDARD, Engine};
use minijinja::{Environment, UndefinedBehavior, Value};
use serde::Serialize;

use crate::{error::TemplateError, ip::IpConfig};

pub const METADATA_TEMPLATE: &str = "metadata.yml.j2";
pub const USERDATA_TEMPLATE: &str = "init.sh.j2";
pub const INVENTORY_TEMPLATE: &str = "inventory.ini.j2";

/// Renders a named template with the given variables
pub trait TemplateRenderer {
    fn render(&self, template: &str, ctx: Value) -> Result<String, TemplateError>;
}

fn strict_env() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env
}

/// Templates read from a directory on every render
pub struct FileTemplates {
    dir: PathBuf,
    env: Environment<'static>,
}

impl FileTemplates {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            env: strict_env(),
        }
    }
}

impl TemplateRenderer for FileTemplates {
    fn render(&self, template: &str, ctx: Value) -> Result<String, TemplateError> {
        let path = self.dir.join(template);
        let source = fs::read_to_string(&path).map_err(|source| TemplateError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(self.env.render_str(&source, ctx)?)
    }
}

/// Templates held in memory, keyed by name
pub struct InlineTemplates {
    templates: HashMap<String, String>,
    env: Environment<'static>,
}

impl InlineTemplates {
    pub fn new<I, K, V>(templates: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            templates: templates
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            env: strict_env(),
        }
    }
}

impl TemplateRenderer for InlineTemplates {
    fn render(&self, template: &str, ctx: Value) -> Result<String, TemplateError> {
        let source = self
            .templates
            .get(template)
            .ok_or_else(|| TemplateError::NotFound(template.to_owned()))?;
        Ok(self.env.render_str(source, ctx)?)
    }
}

#[derive(Serialize)]
struct Metadata<'a> {
    hostname: &'a str,
    ip_address: String,
    /// Prefix length of the node's subnet
    prefix: u8,
    gateway: String,
    dns_servers: &'a [String],
    domains: &'a [String],
}

#[derive(Serialize)]
struct Userdata<'a> {
    vault_address: &'a str,
    vault_token: &'a str,
}

/// Base64 encoded cloud-init metadata and userdata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootPayloads {
    pub metadata: String,
    pub userdata: String,
}

/// Renders a template and base64 encodes the result
pub fn render_encoded(
    renderer: &dyn TemplateRenderer,
    template: &str,
    ctx: Value,
) -> Result<String, TemplateError> {
    let rendered = renderer.render(template, ctx)?;
    Ok(STANDARD.encode(rendered.as_bytes()))
}

/// Renders both payloads for a node. Returns the failing template name with the error.
pub fn render_boot_payloads(
    renderer: &dyn TemplateRenderer,
    hostname: &str,
    ip: &IpConfig,
    prefix: u8,
    vault_address: &str,
    vault_token: &str,
) -> Result<BootPayloads, (&'static str, TemplateError)> {
    let metadata = Value::from_serialize(&Metadata {
        hostname,
        ip_address: ip.ip_address.to_string(),
        prefix,
        gateway: ip.gateway.to_string(),
        dns_servers: &ip.dns_servers,
        domains: &ip.domains,
    });
    let userdata = Value::from_serialize(&Userdata {
        vault_address,
        vault_token,
    });

    Ok(BootPayloads {
        metadata: render_encoded(renderer, METADATA_TEMPLATE, metadata)
            .map_err(|e| (METADATA_TEMPLATE, e))?,
        userdata: render_encoded(renderer, USERDATA_TEMPLATE, userdata)
            .map_err(|e| (USERDATA_TEMPLATE, e))?,
    })
}
