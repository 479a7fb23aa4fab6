use anyhow::{Context, Result, bail};
use regex::{Regex, RegexBuilder};
use tracing::debug;

use cryptex::filecrypt::{self, Outcome};
use cryptex::generator::{self, GeneratorOptions};
use cryptex::{Secret, SecretBox, SecretError, Session, resolve, resolve_required};

use super::{
    BoxArg, Commands, CreateCommand, DeleteCommand, EditArgs, ListCommand, NewSecretArgs, input,
    render, shell,
};

/// Runs one command against `session`.
///
/// The one-shot CLI and the interactive shell both land here; only the
/// shell keeps the session (and its open box) alive afterwards.
pub fn run(command: Commands, session: &mut Session, verbose: bool) -> Result<()> {
    match command {
        Commands::Create(create) => run_create(create, session),
        Commands::List(list) => run_list(list, session),
        Commands::Get {
            reference,
            target,
            stdout,
        } => get(session, &reference, &target, stdout),
        Commands::Print {
            name,
            target,
            unsecure,
        } => {
            let opened = session.open(target.locator())?;
            let resolution = resolve_required(opened.secret_box(), &name)?;
            if let Some(secret) = resolution.secret {
                render::print_secret(secret, unsecure);
            }
            Ok(())
        }
        Commands::Edit(args) => edit(session, args),
        Commands::Delete(delete) => run_delete(delete, session),
        Commands::Open { box_name } => {
            let timeout = session.store().config().timeout();
            shell::run(session, box_name.as_deref(), timeout, verbose)
        }
        Commands::Encrypt { path } => {
            let passphrase = session.passphrases().new_passphrase()?;
            let outcome = filecrypt::encrypt_path(&path, &passphrase)?;
            report(&outcome, "encrypted", verbose);
            Ok(())
        }
        Commands::Decrypt { path } => {
            let passphrase = session.passphrases().passphrase("Password: ")?;
            let outcome = filecrypt::decrypt_path(&path, &passphrase)?;
            report(&outcome, "decrypted", verbose);
            Ok(())
        }
        Commands::Info => info(session),
    }
}

fn run_create(command: CreateCommand, session: &mut Session) -> Result<()> {
    match command {
        CreateCommand::Box { name, owner } => {
            let passphrase = session.passphrases().new_passphrase()?;
            let opened = session.store().create(&name, &owner, &passphrase)?;
            println!("box '{name}' created in {}", opened.path().display());
            session.adopt(opened);
            Ok(())
        }
        CreateCommand::Secret(args) => create_secret(session, args),
        CreateCommand::Item {
            name,
            secret,
            target,
        } => {
            let opened = session.open(target.locator())?;
            let owner = opened
                .secret_box()
                .find(&secret)
                .ok_or_else(|| SecretError::SecretNotFound(secret.clone()))?;
            if owner.item(&name).is_some() {
                bail!(SecretError::ItemAlreadyExists {
                    secret,
                    item: name,
                });
            }

            let Some(value) = input::read_secret_value("Item value")? else {
                bail!("an item needs a value");
            };
            let secret_box = opened.secret_box_mut();
            secret_box
                .find_mut(&secret)
                .ok_or_else(|| SecretError::SecretNotFound(secret.clone()))?
                .add_item(&name, &value)?;
            secret_box.touch();

            session.save()?;
            println!("item '{name}' added to '{secret}' and box saved!");
            Ok(())
        }
        CreateCommand::Password {
            length,
            no_numbers,
            no_letters,
            no_special,
            stdout,
        } => {
            let options = GeneratorOptions {
                length,
                numbers: !no_numbers,
                letters: !no_letters,
                special: !no_special,
            };
            let password = zeroize::Zeroizing::new(generator::generate_password(&options)?);
            deliver(&password, stdout, "password")
        }
    }
}

fn create_secret(session: &mut Session, args: NewSecretArgs) -> Result<()> {
    let opened = session.open(args.target.locator())?;
    if opened.secret_box().contains(&args.name) {
        bail!(SecretError::DuplicateSecretName(args.name));
    }

    let password = input::read_secret_value("Password")?;

    let mut secret = Secret::new(&args.name);
    secret.set_version(&args.secret_version);
    secret.set_login(&args.login);
    secret.set_url(&args.url);
    secret.set_notes(&args.notes);
    if let Some(password) = &password {
        secret.set_password(password);
    }
    for (key, value) in &args.items {
        secret.add_item(key, value)?;
    }

    opened.secret_box_mut().add_secret(secret)?;
    session.save()?;
    println!("secret '{}' added and box saved!", args.name);
    Ok(())
}

fn run_list(command: ListCommand, session: &mut Session) -> Result<()> {
    match command {
        ListCommand::Boxes { filter } => {
            let filter = filter
                .map(|f| Regex::new(&f).with_context(|| format!("invalid filter '{f}'")))
                .transpose()?;
            let boxes = session.store().list_boxes(filter.as_ref())?;
            render::print_boxes(&boxes);
            Ok(())
        }
        ListCommand::Secrets {
            target,
            filter,
            items,
        } => {
            let filter = filter
                .map(|f| {
                    RegexBuilder::new(&f)
                        .case_insensitive(true)
                        .build()
                        .with_context(|| format!("invalid filter '{f}'"))
                })
                .transpose()?;

            let opened = session.open(target.locator())?;
            let secrets = opened
                .secret_box()
                .secrets()
                .iter()
                .filter(|s| filter.as_ref().is_none_or(|re| re.is_match(s.name())));
            render::print_secrets(secrets, items);
            Ok(())
        }
    }
}

fn get(session: &mut Session, reference: &str, target: &BoxArg, stdout: bool) -> Result<()> {
    let opened = session.open(target.locator())?;
    let box_name = opened.secret_box().name().to_string();
    let resolution = resolve(opened.secret_box(), reference);

    if !resolution.is_found() {
        eprintln!("warning: no secret '{reference}' found in box '{box_name}'");
        return Ok(());
    }
    if resolution.is_missing_item() {
        eprintln!(
            "warning: secret '{reference}' has no item '{}'",
            resolution.item
        );
        return Ok(());
    }
    if resolution.value.is_empty() {
        eprintln!("warning: secret '{reference}' has an empty value");
        return Ok(());
    }

    let value = zeroize::Zeroizing::new(resolution.value);
    deliver(&value, stdout, "secret")
}

fn edit(session: &mut Session, args: EditArgs) -> Result<()> {
    if args.is_empty() {
        bail!("nothing to change, see 'cryptex edit --help'");
    }

    let opened = session.open(args.target.locator())?;
    if !opened.secret_box().contains(&args.name) {
        bail!(SecretError::SecretNotFound(args.name));
    }

    let password = if args.password {
        input::read_secret_value("New password")?
    } else {
        None
    };

    let mut edited = opened.secret_box().clone();
    let name = apply_edit(&mut edited, &args, password.as_deref().map(String::as_str))?;
    *opened.secret_box_mut() = edited;

    session.save()?;
    println!("secret '{name}' updated and box saved!");
    Ok(())
}

/// Applies `args` to a copy of the box; the cached box is only replaced
/// once every change went through.
fn apply_edit(
    secret_box: &mut SecretBox,
    args: &EditArgs,
    password: Option<&str>,
) -> Result<String> {
    let secret = secret_box
        .find_mut(&args.name)
        .ok_or_else(|| SecretError::SecretNotFound(args.name.clone()))?;

    if let Some(version) = &args.secret_version {
        secret.set_version(version);
    }
    if let Some(login) = &args.login {
        secret.set_login(login);
    }
    if let Some(url) = &args.url {
        secret.set_url(url);
    }
    if let Some(notes) = &args.notes {
        secret.set_notes(notes);
    }
    if args.password {
        secret.set_password(password.unwrap_or_default());
    }
    for (key, value) in &args.set_items {
        secret.set_item(key, value);
    }
    for key in &args.remove_items {
        secret.remove_item(key)?;
    }

    let name = match &args.new_name {
        Some(new_name) => {
            secret_box.rename_secret(&args.name, new_name)?;
            new_name.clone()
        }
        None => args.name.clone(),
    };
    secret_box.touch();
    Ok(name)
}

fn run_delete(command: DeleteCommand, session: &mut Session) -> Result<()> {
    match command {
        DeleteCommand::Secret { name, target } => {
            let opened = session.open(target.locator())?;
            if !opened.secret_box_mut().remove_secret(&name) {
                eprintln!(
                    "warning: no secret '{name}' in box '{}', nothing deleted",
                    opened.secret_box().name()
                );
                return Ok(());
            }
            session.save()?;
            println!("secret '{name}' deleted and box saved!");
            Ok(())
        }
        DeleteCommand::Box { name } => {
            session.open(Some(name.as_str()))?;
            let Some(opened) = session.take() else {
                bail!("box '{name}' could not be opened");
            };
            session.store().delete(opened)?;
            println!("box '{name}' deleted");
            Ok(())
        }
    }
}

fn info(session: &Session) -> Result<()> {
    let store = session.store();
    println!("cryptex {}", env!("CARGO_PKG_VERSION"));
    println!();
    for (key, value) in store.config().describe() {
        println!("{key:<20} {value}");
    }
    println!("{:<20} {}", "Box folder", store.dir().display());
    println!();
    render::print_boxes(&store.list_boxes(None)?);
    Ok(())
}

fn deliver(value: &str, stdout: bool, what: &str) -> Result<()> {
    if stdout {
        println!("{value}");
        return Ok(());
    }
    input::copy_to_clipboard(value).context("failed to use the clipboard, try --stdout")?;
    debug!(what, "value copied to clipboard");
    println!("{what} copied to clipboard");
    Ok(())
}

fn report(outcome: &Outcome, verb: &str, verbose: bool) {
    if verbose {
        for path in &outcome.processed {
            println!("{verb} {}", path.display());
        }
        for path in &outcome.skipped {
            println!("skipped {}", path.display());
        }
    }
    println!(
        "{} file(s) {verb}, {} skipped",
        outcome.processed.len(),
        outcome.skipped.len()
    );
}
