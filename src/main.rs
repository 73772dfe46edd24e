use std::io::{self, Write};

use chrono::{Local, NaiveDateTime};

use raindash::api::{ApiError, HttpApi};
use raindash::config::ClientConfig;
use raindash::core::account::Account;
use raindash::dashboard::accounts::{
    AccountForm, AccountList, RowAction, RowKind, RowOutcome, SavedAccount,
};
use raindash::dashboard::checkin;
use raindash::dashboard::settings::SettingsPanel;
use raindash::session::{Session, SessionState};
use raindash::store::TokenStore;

const USAGE: &str = "\
raindash - terminal dashboard for Rainyun check-in automation

USAGE:
    raindash [--server URL] [--debug]

The server URL can also be set via RAINDASH_SERVER or the config file.
Run `help` inside the client for the command list.";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("{}", USAGE);
        return Ok(());
    }
    raindash::set_debug_logging(args.iter().any(|a| a == "--debug"));

    // Log to the systemd user journal (`journalctl --user -t raindash -f`).
    // Wrapper filters: raindash at info/debug (per flag), everything else at warn.
    {
        struct FilteredJournal {
            inner: systemd_journal_logger::JournalLog,
        }

        impl log::Log for FilteredJournal {
            fn enabled(&self, metadata: &log::Metadata) -> bool {
                let target = metadata.target();
                if target.starts_with("raindash") {
                    let max = if raindash::debug_logging() {
                        log::LevelFilter::Debug
                    } else {
                        log::LevelFilter::Info
                    };
                    metadata.level() <= max
                } else {
                    metadata.level() <= log::LevelFilter::Warn
                }
            }
            fn log(&self, record: &log::Record) {
                if self.enabled(record.metadata()) {
                    self.inner.log(record);
                }
            }
            fn flush(&self) {
                self.inner.flush();
            }
        }

        match systemd_journal_logger::JournalLog::new() {
            Ok(journal) => {
                let journal = journal.with_syslog_identifier("raindash".to_string());
                log::set_boxed_logger(Box::new(FilteredJournal { inner: journal }))?;
                // Global max must be Debug so debug logs pass through when toggled
                log::set_max_level(log::LevelFilter::Debug);
            }
            Err(e) => eprintln!("journal logging unavailable: {}", e),
        }
    }

    let mut config = ClientConfig::load();
    if !ClientConfig::config_path().exists() {
        // First run: write the defaults so there is a file to edit.
        if let Err(e) = config.save() {
            log::warn!("Could not write default config: {}", e);
        }
    }
    if let Ok(url) = std::env::var("RAINDASH_SERVER") {
        config.server_url = url;
    }
    if let Some(i) = args.iter().position(|a| a == "--server") {
        match args.get(i + 1) {
            Some(url) => config.server_url = url.clone(),
            None => {
                eprintln!("--server requires a URL");
                std::process::exit(2);
            }
        }
    }
    log::info!("Using server {}", config.server_url);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(config))
}

async fn run(config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let tokens = TokenStore::open(ClientConfig::token_path());
    let api = HttpApi::new(&config, tokens.clone())?;
    let mut session = Session::new(api, tokens);
    let mut list = AccountList::new();
    let mut pending_form: Option<AccountForm> = None;

    match session.start().await {
        Ok(Some(data)) => {
            list = AccountList::from_rows(data.accounts);
            print_accounts(list.rows());
            print_settings(&SettingsPanel::from_settings(&data.settings));
        }
        Ok(None) => println!("Not logged in. Use `login` to begin."),
        Err(e) => {
            println!("error: {}", e);
            println!("Stored session was rejected; use `login`.");
        }
    }

    loop {
        print!("raindash> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let mut parts = line.split_whitespace();
        let Some(cmd) = parts.next() else { continue };
        let arg = parts.next();

        match cmd {
            "quit" | "exit" => break,
            "help" => print_help(),
            "login" => {
                if session.state() == SessionState::Dashboard {
                    println!("Already logged in.");
                    continue;
                }
                let password = prompt("Password: ")?;
                match session.login(&password).await {
                    Ok(success) => {
                        list = AccountList::from_rows(success.dashboard.accounts);
                        match success.expires_in_days {
                            Some(days) => println!("Logged in (token valid {} days).", days),
                            None => println!("Logged in."),
                        }
                        print_accounts(list.rows());
                        print_settings(&SettingsPanel::from_settings(&success.dashboard.settings));
                    }
                    Err(e) => println!("error: {}", e),
                }
            }
            "logout" => {
                session.logout();
                list = AccountList::new();
                pending_form = None;
                println!("Logged out.");
            }
            _ => {
                if session.state() != SessionState::Dashboard {
                    println!("Not logged in. Use `login` first, or `help`.");
                    continue;
                }
                run_dashboard_command(cmd, arg, &mut session, &mut list, &mut pending_form).await;
            }
        }
    }

    Ok(())
}

async fn run_dashboard_command(
    cmd: &str,
    arg: Option<&str>,
    session: &mut Session<HttpApi>,
    list: &mut AccountList,
    pending_form: &mut Option<AccountForm>,
) {
    match cmd {
        "list" => {
            let result = list.refresh(session.api()).await;
            match result {
                Ok(()) => print_accounts(list.rows()),
                Err(e) => report(session, &e),
            }
        }
        "new" => {
            if pending_form.is_some() {
                println!("A form with unsaved changes is pending; `save` or `discard` it first.");
                return;
            }
            let mut form = AccountForm::new();
            if edit_form_interactively(&mut form).is_err() {
                return;
            }
            save_form(session, list, form, pending_form).await;
        }
        "edit" => {
            let Some(id) = arg else {
                println!("usage: edit <id>");
                return;
            };
            if pending_form.is_some() {
                println!("A form with unsaved changes is pending; `save` or `discard` it first.");
                return;
            }
            let action = RowAction {
                id: id.to_string(),
                kind: RowKind::Edit,
            };
            let outcome = list
                .dispatch(session.api(), &mut confirm_delete_prompt, action)
                .await;
            match outcome {
                Ok(RowOutcome::Editing(mut form)) => {
                    if edit_form_interactively(&mut form).is_err() {
                        return;
                    }
                    save_form(session, list, form, pending_form).await;
                }
                Ok(RowOutcome::NotFound) => {
                    // Deleted by another session since the last render;
                    // the next refresh drops the row.
                    log::info!("Edit target {} no longer exists", id);
                }
                Ok(_) => {}
                Err(e) => report(session, &e),
            }
        }
        "delete" => {
            let Some(id) = arg else {
                println!("usage: delete <id>");
                return;
            };
            let action = RowAction {
                id: id.to_string(),
                kind: RowKind::Delete,
            };
            let outcome = list
                .dispatch(session.api(), &mut confirm_delete_prompt, action)
                .await;
            match outcome {
                Ok(RowOutcome::Deleted) => {
                    println!("Account deleted.");
                    print_accounts(list.rows());
                }
                Ok(RowOutcome::DeleteCancelled) => {}
                Ok(_) => {}
                Err(e) => report(session, &e),
            }
        }
        "enable" | "disable" => {
            let Some(id) = arg else {
                println!("usage: {} <id>", cmd);
                return;
            };
            let action = RowAction {
                id: id.to_string(),
                kind: RowKind::SetEnabled(cmd == "enable"),
            };
            let outcome = list
                .dispatch(session.api(), &mut confirm_delete_prompt, action)
                .await;
            match outcome {
                Ok(RowOutcome::FlagsUpdated(account)) => {
                    println!(
                        "Account {} {}.",
                        account.label(),
                        if account.enabled { "enabled" } else { "disabled" }
                    );
                }
                Ok(_) => {}
                Err(e) => report(session, &e),
            }
        }
        "save" => match pending_form.take() {
            Some(form) => save_form(session, list, form, pending_form).await,
            None => println!("Nothing to save."),
        },
        "discard" => {
            if pending_form.take().is_some() {
                println!("Form discarded.");
            } else {
                println!("Nothing to discard.");
            }
        }
        "checkin" => {
            let result = checkin::run_checkin(session.api(), list).await;
            match result {
                Ok(summary) => {
                    println!("Check-in finished for {} account(s).", summary.processed());
                    for outcome in &summary.outcomes {
                        let label = outcome.name.as_deref().or(outcome.id.as_deref());
                        if let (Some(label), Some(status)) = (label, outcome.status.as_deref()) {
                            println!("  {}: {}", label, status);
                        }
                    }
                    print_accounts(list.rows());
                }
                Err(e) => report(session, &e),
            }
        }
        "settings" => {
            let result = SettingsPanel::load(session.api()).await;
            match result {
                Ok(panel) => print_settings(&panel),
                Err(e) => report(session, &e),
            }
        }
        "edit-settings" => {
            let loaded = SettingsPanel::load(session.api()).await;
            let mut panel = match loaded {
                Ok(panel) => panel,
                Err(e) => {
                    report(session, &e);
                    return;
                }
            };
            if edit_settings_interactively(&mut panel).is_err() {
                return;
            }
            let result = panel.save(session.api()).await;
            match result {
                Ok(saved) => {
                    println!("Settings saved.");
                    print_settings(&SettingsPanel::from_settings(&saved));
                }
                Err(e) => report(session, &e),
            }
        }
        _ => println!("Unknown command `{}`; try `help`.", cmd),
    }
}

/// Action-boundary error handling: every failure becomes a one-line
/// notification, and an unauthorized one additionally forces logout.
fn report(session: &mut Session<HttpApi>, error: &ApiError) {
    println!("error: {}", error);
    session.note_failure(error);
    if error.is_unauthorized() {
        println!("Session expired; use `login` to continue.");
    }
}

async fn save_form(
    session: &mut Session<HttpApi>,
    list: &mut AccountList,
    mut form: AccountForm,
    pending_form: &mut Option<AccountForm>,
) {
    let result = form.save(session.api(), list).await;
    match result {
        Ok(saved) => {
            let verb = match &saved {
                SavedAccount::Created(_) => "created",
                SavedAccount::Updated(_) => "updated",
            };
            println!("Account {} {}.", saved.account().label(), verb);
            print_accounts(list.rows());
        }
        Err(e) => {
            report(session, &e);
            if session.state() == SessionState::Dashboard {
                *pending_form = Some(form);
                println!("Form kept; `save` to retry or `discard` to drop it.");
            }
        }
    }
}

/// Interactive confirmation for `delete` (the `confirm()` dialog analog).
fn confirm_delete_prompt(label: &str) -> bool {
    match prompt(&format!("Delete account '{}'? [y/N] ", label)) {
        Ok(answer) => answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"),
        Err(_) => false,
    }
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Prompt showing the current value; empty input keeps it.
fn prompt_with_default(label: &str, current: &str) -> io::Result<String> {
    let answer = prompt(&format!("{} [{}]: ", label, current))?;
    Ok(if answer.is_empty() {
        current.to_string()
    } else {
        answer
    })
}

fn prompt_bool(label: &str, current: bool) -> io::Result<bool> {
    let shown = if current { "Y/n" } else { "y/N" };
    let answer = prompt(&format!("{} [{}]: ", label, shown))?;
    Ok(match answer.to_ascii_lowercase().as_str() {
        "" => current,
        "y" | "yes" => true,
        _ => false,
    })
}

fn edit_form_interactively(form: &mut AccountForm) -> io::Result<()> {
    form.name = prompt_with_default("Name", &form.name)?;
    form.username = prompt_with_default("Username", &form.username)?;
    form.password = prompt_with_default("Password", &form.password)?;
    form.api_key = prompt_with_default("API key", &form.api_key)?;
    form.renew_products = prompt_with_default("Renew products (ids, comma-separated)", &form.renew_products)?;
    form.enabled = prompt_bool("Enabled", form.enabled)?;
    form.auto_renew = prompt_bool("Auto-renew", form.auto_renew)?;
    Ok(())
}

fn edit_settings_interactively(panel: &mut SettingsPanel) -> io::Result<()> {
    panel.auto_renew = prompt_bool("Auto-renew", panel.auto_renew)?;
    let days = prompt_with_default(
        "Renew threshold (days)",
        &panel.renew_threshold_days.to_string(),
    )?;
    match days.parse::<i64>() {
        Ok(days) => panel.renew_threshold_days = days,
        Err(_) => println!("Not a number, keeping {}.", panel.renew_threshold_days),
    }
    panel.cron_schedule = prompt_with_default("Cron schedule", &panel.cron_schedule)?;
    Ok(())
}

fn print_accounts(rows: &[Account]) {
    if rows.is_empty() {
        println!("No accounts configured. Use `new` to add one.");
        return;
    }
    println!(
        "{:<14} {:<20} {:<8} {:<12} {}",
        "ID", "NAME", "ENABLED", "STATUS", "LAST CHECK-IN"
    );
    for account in rows {
        println!(
            "{:<14} {:<20} {:<8} {:<12} {}",
            account.id,
            account.label(),
            if account.enabled { "yes" } else { "no" },
            account.last_status.as_deref().unwrap_or("-"),
            last_checkin_text(account),
        );
    }
}

fn print_settings(panel: &SettingsPanel) {
    println!(
        "Settings: auto-renew {}, threshold {} days, schedule '{}'",
        if panel.auto_renew { "on" } else { "off" },
        panel.renew_threshold_days,
        panel.cron_schedule,
    );
}

fn print_help() {
    println!(
        "\
Commands:
  login               authenticate and open the dashboard
  logout              drop the session token
  list                refresh and print the account table
  new                 create an account (interactive)
  edit <id>           edit an account (fields pre-filled)
  delete <id>         delete an account (asks for confirmation)
  enable <id>         enable check-ins for an account
  disable <id>        disable check-ins for an account
  save / discard      retry or drop a form whose save failed
  checkin             run the batch check-in now
  settings            show the automation settings
  edit-settings       change the automation settings
  quit                exit"
    );
}

fn last_checkin_text(account: &Account) -> String {
    let Some(raw) = account.last_checkin.as_deref() else {
        return "never".to_string();
    };
    match parse_timestamp(raw) {
        Some(when) => {
            let days = (Local::now().date_naive() - when.date()).num_days();
            match days {
                0 => "today".to_string(),
                1 => "yesterday".to_string(),
                d if d > 1 => format!("{} days ago", d),
                _ => raw.to_string(),
            }
        }
        None => raw.to_string(),
    }
}

/// Best-effort parse of the server's timestamp string; the exact format
/// is not part of the documented contract.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    None
}
