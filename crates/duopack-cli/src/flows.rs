use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use duopack_core::{Archiver, Fetcher, PackageFormat, Settings, SELF_PACKAGE_NAME};
use duopack_installer::{
    install_legacy, install_modern, plan, remove_package, BaseLayout, InstallPlan, ManifestStore,
    RemoveStatus,
};
use duopack_registry::{RepoAddOutcome, RepositoryRegistry};
use duopack_resolver::{find_cached_descriptor, resolve, search};

use crate::render::{confirm, format_size, say, status};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed { version: String },
    Upgraded { from: String, to: String },
    AlreadyNewest { version: String },
    Simulated { version: String },
    DownloadedOnly { path: PathBuf },
    Declined,
}

fn bootstrap(layout: &BaseLayout) -> Result<ManifestStore> {
    layout.ensure_base_dirs()?;
    let store = ManifestStore::new(layout);
    store.seed_self_record(layout)?;
    Ok(store)
}

fn open_registry(layout: &BaseLayout, fetcher: &dyn Fetcher) -> Result<RepositoryRegistry> {
    let mut registry = RepositoryRegistry::open(layout.root())?;
    registry.probe(fetcher)?;
    Ok(registry)
}

/// Resolves one package and reconciles it against the installed record:
/// no-op when already current, install or upgrade otherwise. The downloaded
/// artifact is owned by this attempt and only survives under
/// `--download-only`.
pub fn install_or_upgrade(
    layout: &BaseLayout,
    settings: &Settings,
    fetcher: &dyn Fetcher,
    archiver: &dyn Archiver,
    registry: &RepositoryRegistry,
    store: &ManifestStore,
    name: &str,
) -> Result<InstallOutcome> {
    let resolution = resolve(registry, fetcher, name)?;
    let descriptor = &resolution.descriptor;
    let verdict = plan(store, name, &descriptor.version)?;

    if verdict == InstallPlan::UpToDate {
        let _ = fs::remove_file(&resolution.artifact);
        say(
            settings,
            &format!(
                "{name} is already the newest version ({}).",
                descriptor.version
            ),
        );
        return Ok(InstallOutcome::AlreadyNewest {
            version: descriptor.version.clone(),
        });
    }

    match &verdict {
        InstallPlan::NotInstalled => {
            say(settings, "The following NEW packages will be installed:");
            let size_note = if descriptor.size > 0 {
                format!(" [{}]", format_size(descriptor.size))
            } else {
                String::new()
            };
            say(
                settings,
                &format!("  {name} ({}){size_note}", descriptor.version),
            );
            if descriptor.size > 0 {
                say(
                    settings,
                    &format!("Need to download {} of archives.", format_size(descriptor.size)),
                );
            }
        }
        InstallPlan::UpgradeAvailable {
            installed,
            available,
        } => {
            say(settings, "The following packages will be upgraded:");
            say(settings, &format!("  {name} ({installed} -> {available})"));
        }
        InstallPlan::UpToDate => unreachable!("handled above"),
    }

    if !confirm(settings, "Do you want to continue?")? {
        let _ = fs::remove_file(&resolution.artifact);
        say(settings, "Abort.");
        return Ok(InstallOutcome::Declined);
    }

    if settings.download_only {
        say(
            settings,
            &format!("Downloaded to: {}", resolution.artifact.display()),
        );
        return Ok(InstallOutcome::DownloadedOnly {
            path: resolution.artifact,
        });
    }

    if settings.simulate {
        let _ = fs::remove_file(&resolution.artifact);
        say(
            settings,
            &format!("Would install {name} version {}", descriptor.version),
        );
        return Ok(InstallOutcome::Simulated {
            version: descriptor.version.clone(),
        });
    }

    status(
        settings,
        &format!("Installing {name} ({})...", descriptor.version),
    );
    let manifest = match descriptor.format {
        PackageFormat::Modern => install_modern(layout, archiver, &resolution.artifact)?,
        PackageFormat::Legacy => install_legacy(layout, archiver, &resolution.artifact, name)?,
    };

    store.save(name, &descriptor.version, &manifest)?;
    let _ = fs::remove_file(&resolution.artifact);

    if descriptor.format == PackageFormat::Legacy {
        say(
            settings,
            &format!(
                "Installed to {}; executables are linked into {}.",
                layout.package_install_dir(name).display(),
                layout.bin_dir().display()
            ),
        );
    }

    match verdict {
        InstallPlan::NotInstalled => Ok(InstallOutcome::Installed {
            version: descriptor.version.clone(),
        }),
        InstallPlan::UpgradeAvailable { installed, .. } => Ok(InstallOutcome::Upgraded {
            from: installed,
            to: descriptor.version.clone(),
        }),
        InstallPlan::UpToDate => unreachable!("handled above"),
    }
}

pub fn run_update(
    layout: &BaseLayout,
    settings: &Settings,
    fetcher: &dyn Fetcher,
) -> Result<()> {
    bootstrap(layout)?;
    let registry = open_registry(layout, fetcher)?;

    status(settings, "Updating package cache...");
    let reports = registry.refresh_caches(fetcher)?;
    for report in &reports {
        say(settings, &format!("Fetching from: {}", report.url));
        if !report.ok {
            say(settings, &format!("  could not refresh {}", report.url));
        }
    }
    status(settings, "Package cache updated.");
    Ok(())
}

pub fn run_install(
    layout: &BaseLayout,
    settings: &Settings,
    fetcher: &dyn Fetcher,
    archiver: &dyn Archiver,
    names: &[String],
) -> Result<()> {
    let store = bootstrap(layout)?;
    let registry = open_registry(layout, fetcher)?;

    let mut failures = 0;
    for name in names {
        match install_or_upgrade(layout, settings, fetcher, archiver, &registry, &store, name) {
            Ok(InstallOutcome::Installed { version }) => status(
                settings,
                &format!("Package {name} ({version}) installed successfully."),
            ),
            Ok(InstallOutcome::Upgraded { from, to }) => status(
                settings,
                &format!("Package {name} upgraded ({from} -> {to})."),
            ),
            Ok(_) => {}
            Err(err) => {
                eprintln!("{name}: {err:#}");
                if format!("{err:#}").contains("not found in any repository") {
                    eprintln!("Try running 'duopack update' first.");
                }
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} package(s) could not be installed");
    }
    Ok(())
}

pub fn run_upgrade(
    layout: &BaseLayout,
    settings: &Settings,
    fetcher: &dyn Fetcher,
    archiver: &dyn Archiver,
    name: Option<&str>,
) -> Result<()> {
    match name {
        Some(name) => run_upgrade_one(layout, settings, fetcher, archiver, name),
        None => run_upgrade_all(layout, settings, fetcher, archiver),
    }
}

fn run_upgrade_one(
    layout: &BaseLayout,
    settings: &Settings,
    fetcher: &dyn Fetcher,
    archiver: &dyn Archiver,
    name: &str,
) -> Result<()> {
    let store = bootstrap(layout)?;
    if store.load(name)?.is_none() {
        bail!("package {name} is not installed");
    }

    let registry = open_registry(layout, fetcher)?;
    install_or_upgrade(layout, settings, fetcher, archiver, &registry, &store, name)?;
    Ok(())
}

fn run_upgrade_all(
    layout: &BaseLayout,
    settings: &Settings,
    fetcher: &dyn Fetcher,
    archiver: &dyn Archiver,
) -> Result<()> {
    let store = bootstrap(layout)?;
    let registry = open_registry(layout, fetcher)?;

    let names = store.installed_names()?;
    if names.is_empty() {
        say(settings, "No packages installed.");
        return Ok(());
    }

    say(settings, "Checking for upgrades...");
    let mut pending = Vec::new();
    for name in &names {
        // Only packages present in a cached modern index can be compared;
        // legacy-only installs have no version source without a download.
        let Some(descriptor) = find_cached_descriptor(&registry, name) else {
            continue;
        };
        if let InstallPlan::UpgradeAvailable {
            installed,
            available,
        } = plan(&store, name, &descriptor.version)?
        {
            say(settings, &format!("  {name} ({installed} -> {available})"));
            pending.push(name.clone());
        }
    }

    if pending.is_empty() {
        say(settings, "All packages are up to date.");
        return Ok(());
    }
    say(
        settings,
        &format!("{} package(s) can be upgraded.", pending.len()),
    );

    if !confirm(settings, "Do you want to continue?")? {
        say(settings, "Abort.");
        return Ok(());
    }

    let mut failures = 0;
    for name in &pending {
        match install_or_upgrade(layout, settings, fetcher, archiver, &registry, &store, name) {
            Ok(InstallOutcome::Upgraded { from, to }) => status(
                settings,
                &format!("Package {name} upgraded ({from} -> {to})."),
            ),
            Ok(_) => {}
            Err(err) => {
                eprintln!("{name}: {err:#}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} package(s) could not be upgraded");
    }
    Ok(())
}

pub fn run_purge(layout: &BaseLayout, settings: &Settings, names: &[String]) -> Result<()> {
    let store = bootstrap(layout)?;

    let mut failures = 0;
    for name in names {
        if name == SELF_PACKAGE_NAME {
            eprintln!("Cannot remove {name} while using it.");
            failures += 1;
            continue;
        }
        if store.load(name)?.is_none() {
            say(settings, &format!("Package {name} is not installed."));
            failures += 1;
            continue;
        }
        if !confirm(settings, "Do you want to continue?")? {
            say(settings, "Abort.");
            failures += 1;
            continue;
        }
        if settings.simulate {
            say(settings, &format!("Would remove {name}"));
            continue;
        }

        status(settings, &format!("Removing {name}..."));
        match remove_package(layout, &store, name)? {
            RemoveStatus::Removed { .. } => {
                status(settings, &format!("Package {name} removed."));
            }
            RemoveStatus::NotInstalled => {
                say(settings, &format!("Package {name} is not installed."));
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} package(s) could not be removed");
    }
    Ok(())
}

pub fn run_search(
    layout: &BaseLayout,
    settings: &Settings,
    fetcher: &dyn Fetcher,
    query: &str,
) -> Result<()> {
    bootstrap(layout)?;
    let registry = open_registry(layout, fetcher)?;

    say(settings, &format!("Searching for: {query}\n"));
    let hits = search(&registry, query);
    if hits.is_empty() {
        println!("No packages found matching '{query}'");
        return Ok(());
    }

    for hit in &hits {
        match hit.format {
            PackageFormat::Modern => {
                println!("{}/{} ({})", hit.repo_url, hit.name, hit.version);
                if !hit.description.is_empty() {
                    println!("  {}", hit.description);
                }
                println!();
            }
            PackageFormat::Legacy => {
                println!("{}/{}", hit.repo_url, hit.name);
            }
        }
    }
    Ok(())
}

pub fn run_show(layout: &BaseLayout, fetcher: &dyn Fetcher, name: &str, json: bool) -> Result<()> {
    let store = bootstrap(layout)?;
    let registry = open_registry(layout, fetcher)?;

    let Some(descriptor) = find_cached_descriptor(&registry, name) else {
        bail!("package '{name}' not found; run 'duopack update' to refresh the package cache");
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&descriptor).context("failed to render descriptor")?
        );
        return Ok(());
    }

    println!("Package: {}", descriptor.name);
    if !descriptor.display_name.is_empty() {
        println!("Name: {}", descriptor.display_name);
    }
    println!("Version: {}", descriptor.version);
    println!("Architecture: {}", descriptor.architecture);
    if descriptor.size > 0 {
        println!("Size: {}", format_size(descriptor.size));
    }
    if !descriptor.description.is_empty() {
        println!("Description: {}", descriptor.description);
    }
    if let Some(record) = store.load(name)? {
        println!("Installed: {}", record.version);
    }
    Ok(())
}

pub fn run_list(layout: &BaseLayout, json: bool) -> Result<()> {
    let store = bootstrap(layout)?;
    let names = store.installed_names()?;

    if json {
        let mut entries = Vec::new();
        for name in &names {
            let Some(record) = store.load(name)? else {
                continue;
            };
            entries.push(serde_json::json!({
                "name": name,
                "version": record.version,
            }));
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).context("failed to render package list")?
        );
        return Ok(());
    }

    println!("Installed packages:");
    if names.is_empty() {
        println!("  No packages installed.");
        return Ok(());
    }
    for name in &names {
        match store.load(name)? {
            Some(record) => println!("  {name} ({})", record.version),
            None => println!("  {name}"),
        }
    }
    Ok(())
}

pub fn run_repo_list(layout: &BaseLayout, fetcher: &dyn Fetcher) -> Result<()> {
    bootstrap(layout)?;
    let registry = open_registry(layout, fetcher)?;

    println!("Configured repositories:");
    for (pos, repo) in registry.repositories().iter().enumerate() {
        println!("{}. {} [{}]", pos + 1, repo.url, repo.tier.as_str());
    }
    Ok(())
}

pub fn run_repo_add(layout: &BaseLayout, fetcher: &dyn Fetcher, url: &str) -> Result<()> {
    bootstrap(layout)?;
    let mut registry = RepositoryRegistry::open(layout.root())?;

    match registry.add(url, fetcher)? {
        RepoAddOutcome::AlreadyPresent => println!("Repository already exists."),
        RepoAddOutcome::Added => {
            println!("Repository added: {url}");
            println!("Run 'duopack update' to fetch package lists.");
        }
    }
    Ok(())
}

pub fn run_repo_remove(layout: &BaseLayout, url: &str) -> Result<()> {
    bootstrap(layout)?;
    let mut registry = RepositoryRegistry::open(layout.root())?;
    registry.remove(url)?;
    println!("Repository removed: {url}");
    Ok(())
}
