use minijinja::Environment;
use once_cell::sync::Lazy;
use serde::Serialize;
use strum::{EnumIter, IntoEnumIterator};
use tracing::{error, info};

static TEMPLATES_ENVIRONMENT: Lazy<Environment> = Lazy::new(|| {
    info!("Initializing templating engine environment.");
    let mut env = Environment::new();

    // Use strum to iterate over the variants of the enum.
    for template in MessageTemplate::iter() {
        if let Err(e) = env.add_template(template.name(), template.template()) {
            error!("Could not load template {}: {e}", template.name());
        }
    }

    info!("Templates loaded in templating engine environment.");

    env
});

#[derive(EnumIter)]
pub enum MessageTemplate {
    Help,
    RefreshSuccess,
    RefreshCooldown,
    RefreshInProgress,
    RefreshFailed,
    Status,
    LookupFound,
    LookupNotFound,
    BadgeToggled,
    DataRefreshed,
    RequestFailed,
}

impl MessageTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            MessageTemplate::Help => "help.txt",
            MessageTemplate::RefreshSuccess => "refresh_success.txt",
            MessageTemplate::RefreshCooldown => "refresh_cooldown.txt",
            MessageTemplate::RefreshInProgress => "refresh_in_progress.txt",
            MessageTemplate::RefreshFailed => "refresh_failed.txt",
            MessageTemplate::Status => "status.txt",
            MessageTemplate::LookupFound => "lookup_found.txt",
            MessageTemplate::LookupNotFound => "lookup_not_found.txt",
            MessageTemplate::BadgeToggled => "badge_toggled.txt",
            MessageTemplate::DataRefreshed => "data_refreshed.txt",
            MessageTemplate::RequestFailed => "request_failed.txt",
        }
    }

    pub fn render<S: Serialize>(&self, ctx: S) -> Result<String, minijinja::Error> {
        TEMPLATES_ENVIRONMENT.get_template(self.name())?.render(ctx)
    }

    pub fn template(&self) -> &'static str {
        // \n\ at each code line end creates a line break at the proper position and discards further spaces in this line of code.
        // \x20 (hex; 32 in decimal) is an ASCII space and an indicator for the first space to be preserved in this line of the string.
        match self {
            MessageTemplate::Help => {
                "🗒️ Proof of Stars commands:\n\
                \x20 !refresh        download the full leaderboard (once every 24h)\n\
                \x20 !status         cache state, size and last update\n\
                \x20 !lookup <user>  rank badge for a handle, e.g. !lookup @alice\n\
                \x20 !badge on|off   show or hide badges on profiles\n\
                \x20 !help           this message"
            }
            MessageTemplate::RefreshSuccess => {
                "⭐ Rankings updated: {{ total }} entries cached ({{ timestamp }})."
            }
            MessageTemplate::RefreshCooldown => {
                "⏳ Update cooldown, next update possible in {{ remaining }}."
            }
            MessageTemplate::RefreshInProgress => "🔄 An update is already running.",
            MessageTemplate::RefreshFailed => "❌ Update failed. {{ detail }}",
            MessageTemplate::Status => {
                "📦 Cache status: {{ state }}\n\
                \x20 Entries: {{ count }} / {{ max }}\n\
                \x20 Last update: {{ last_update }}\n\
                \x20 Badges: {% if badge_enabled %}on{% else %}off{% endif %}"
            }
            MessageTemplate::LookupFound => "{{ name }} {{ badge }}",
            MessageTemplate::LookupNotFound => "No ranking found.",
            MessageTemplate::BadgeToggled => {
                "🏷️ Badges turned {% if enabled %}on{% else %}off{% endif %}."
            }
            MessageTemplate::DataRefreshed => "🔔 Cached rankings changed, badges will refresh.",
            MessageTemplate::RequestFailed => "⚠️ Could not read the cache: {{ detail }}",
        }
    }
}
