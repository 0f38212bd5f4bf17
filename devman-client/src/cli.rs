use anyhow::{Result, bail};
use clap::{ArgGroup, Parser};
use devman_shared::tags::{TagAction, TagSet};
use tracing::debug;

use crate::admin::DeviceAdmin;
use crate::error::DeviceAdminError;
use crate::config::Config;
use crate::tui::devices;
use crate::util::logging;

const USAGE_HINT: &str = "Please specify an action: --list, --remove ID, --remove-old DAYS, \
--list-tags ID, --add-tags ID TAGS, --remove-tags ID TAGS or --find-device TERM";

#[derive(Parser, Debug)]
#[command(name = "devman")]
#[command(version, about = "Manage devices and tags on a tailnet", long_about = None)]
#[command(group(
    ArgGroup::new("action")
        .args(["list", "remove", "remove_old", "list_tags", "add_tags", "remove_tags", "find_device"])
        .multiple(false)
))]
struct Cli {
    /// API key used as bearer credential for every call
    #[arg(long, value_name = "KEY")]
    api_key: String,

    /// Override the registry API base URL
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// List all devices
    #[arg(long)]
    list: bool,

    /// Remove a specific device by ID
    #[arg(long, value_name = "ID")]
    remove: Option<String>,

    /// Remove devices not seen for more than DAYS days
    #[arg(long, value_name = "DAYS")]
    remove_old: Option<u32>,

    /// List the tags of a device
    #[arg(long, value_name = "ID")]
    list_tags: Option<String>,

    /// Add comma-separated tags to a device
    #[arg(long, num_args = 2, value_names = ["ID", "TAGS"])]
    add_tags: Option<Vec<String>>,

    /// Remove comma-separated tags from a device
    #[arg(long, num_args = 2, value_names = ["ID", "TAGS"])]
    remove_tags: Option<Vec<String>>,

    /// Find devices whose hostname contains TERM (case-insensitive)
    #[arg(long, value_name = "TERM")]
    find_device: Option<String>,
}

/// A single top-level action per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    List,
    Remove(String),
    RemoveOld(u32),
    ListTags(String),
    UpdateTags {
        device_id: String,
        tags: TagSet,
        action: TagAction,
    },
    FindDevice(String),
}

impl Cli {
    fn action(&self) -> Result<Option<Action>> {
        if self.list {
            return Ok(Some(Action::List));
        }
        if let Some(id) = &self.remove {
            return Ok(Some(Action::Remove(id.clone())));
        }
        if let Some(days) = self.remove_old {
            return Ok(Some(Action::RemoveOld(days)));
        }
        if let Some(id) = &self.list_tags {
            return Ok(Some(Action::ListTags(id.clone())));
        }
        if let Some(args) = &self.add_tags {
            return tag_action(args, TagAction::Add).map(Some);
        }
        if let Some(args) = &self.remove_tags {
            return tag_action(args, TagAction::Remove).map(Some);
        }
        if let Some(term) = &self.find_device {
            return Ok(Some(Action::FindDevice(term.clone())));
        }
        Ok(None)
    }
}

fn tag_action(args: &[String], action: TagAction) -> Result<Action> {
    let [device_id, list] = args else {
        bail!("expected a device ID and a comma-separated tag list");
    };
    let tags = TagSet::parse(list);
    if tags.is_empty() {
        bail!("no tags given for device {device_id}");
    }
    Ok(Action::UpdateTags {
        device_id: device_id.clone(),
        tags,
        action,
    })
}

fn tag_update_error(err: DeviceAdminError, action: TagAction, device_id: &str) -> anyhow::Error {
    match err {
        // the write went through, so "failed to update" would be wrong here
        e @ DeviceAdminError::Unverified { .. } => e.into(),
        e => anyhow::Error::new(e).context(format!("Failed to {action} tags on device {device_id}")),
    }
}

pub async fn execute(admin: &DeviceAdmin, action: Action) -> Result<()> {
    debug!(?action, "Executing");
    match action {
        Action::List => {
            let list = admin.list_devices().await?;
            devices::print_devices_table(&list, admin.now());
        }
        Action::Remove(id) => {
            admin.remove_device(&id).await?;
            println!("Device {id} removed successfully.");
        }
        Action::RemoveOld(days) => {
            let removed = admin
                .remove_older_than_with(days, devices::print_removal)
                .await?;
            devices::print_removed(&removed, days);
        }
        Action::ListTags(id) => {
            let tags = admin.list_tags(&id).await?;
            devices::print_tags(&id, &tags);
        }
        Action::UpdateTags {
            device_id,
            tags,
            action,
        } => {
            let update = admin
                .update_tags(&device_id, &tags, action)
                .await
                .map_err(|e| tag_update_error(e, action, &device_id))?;
            devices::print_tag_update(&update);
        }
        Action::FindDevice(term) => {
            let found = admin.find_devices(&term).await?;
            devices::print_search_results(&term, &found, admin.now());
        }
    }
    Ok(())
}

pub async fn cli() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.api_url.as_deref(), cli.verbose);
    logging::init_tracing(&config.log_level, cli.verbose);
    debug!("Using registry at {}", config.api_url);

    let Some(action) = cli.action()? else {
        println!("{USAGE_HINT}");
        return Ok(());
    };

    let admin = DeviceAdmin::new(&config, cli.api_key);
    execute(&admin, action).await
}
