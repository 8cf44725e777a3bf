use bmr_core::*;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "bmrp")]
#[command(about = "Body metric profiles and BMR calculator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute BMR for the given metrics without storing anything
    Calc {
        #[arg(long)]
        gender: Gender,

        /// Weight in kg
        #[arg(long)]
        weight: f64,

        /// Height in cm
        #[arg(long)]
        height: f64,

        /// Age in years
        #[arg(long)]
        age: u32,
    },

    /// Manage stored profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Show the active profile (default)
    Show,

    /// Compose a nutrition advice prompt for the active profile
    Advice {
        /// Goal, e.g. "lose weight"
        #[arg(long, default_value = "")]
        goal: String,

        /// Dietary preferences or restrictions
        #[arg(long, default_value = "")]
        preferences: String,

        /// Response language (en, zh)
        #[arg(long)]
        language: Option<Language>,
    },

    /// Parse a saved food-image analysis response
    Analyze {
        /// File holding the raw model response
        response: PathBuf,

        /// Language for fallback messages (en, zh)
        #[arg(long)]
        language: Option<Language>,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// List profiles in creation order
    List,

    /// Create a profile and make it active
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        age: Option<u32>,

        #[arg(long)]
        gender: Option<Gender>,

        /// Height in cm
        #[arg(long)]
        height: Option<f64>,

        /// Weight in kg
        #[arg(long)]
        weight: Option<f64>,

        /// Keep the current selection
        #[arg(long)]
        no_select: bool,
    },

    /// Change a profile; omitted fields keep their values
    Edit {
        /// Id, unique id prefix, or list position
        profile: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        age: Option<u32>,

        #[arg(long)]
        gender: Option<Gender>,

        #[arg(long)]
        height: Option<f64>,

        #[arg(long)]
        weight: Option<f64>,
    },

    /// Delete a profile
    Rm {
        /// Id, unique id prefix, or list position
        profile: String,
    },

    /// Make a profile active; selecting the active profile deselects it
    Select {
        /// Id, unique id prefix, or list position
        profile: String,
    },

    /// Clear the active profile
    Deselect,
}

fn main() {
    bmr_core::logging::init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let repo = JsonFileRepository::in_dir(&data_dir);
    tracing::debug!("Using profile file {:?}", repo.path());

    match cli.command {
        Some(Commands::Calc {
            gender,
            weight,
            height,
            age,
        }) => cmd_calc(Metrics {
            age,
            gender,
            height,
            weight,
        }),
        Some(Commands::Profile { action }) => cmd_profile(&repo, action, &config),
        Some(Commands::Show) | None => cmd_show(&repo),
        Some(Commands::Advice {
            goal,
            preferences,
            language,
        }) => cmd_advice(
            &repo,
            &goal,
            &preferences,
            language.unwrap_or(config.advice.language),
        ),
        Some(Commands::Analyze { response, language }) => {
            cmd_analyze(&response, language.unwrap_or(config.advice.language))
        }
    }
}

fn cmd_calc(metrics: Metrics) -> Result<()> {
    metrics.validate()?;
    println!("BMR: {} kcal/day", format_kcal(metrics.bmr()));
    Ok(())
}

fn cmd_profile(repo: &JsonFileRepository, action: ProfileAction, config: &Config) -> Result<()> {
    match action {
        ProfileAction::List => {
            let store = repo.load_profiles()?;
            display_profiles(&store);
            Ok(())
        }

        ProfileAction::Add {
            name,
            age,
            gender,
            height,
            weight,
            no_select,
        } => {
            let defaults = config.defaults.metrics();
            let metrics = Metrics {
                age: age.unwrap_or(defaults.age),
                gender: gender.unwrap_or(defaults.gender),
                height: height.unwrap_or(defaults.height),
                weight: weight.unwrap_or(defaults.weight),
            };

            let profile = update_profiles(repo, |store| {
                let profile = store.create(metrics, &name)?;
                if !no_select {
                    store.select(Some(&profile.id))?;
                }
                Ok(profile)
            })?;

            println!("✓ Created profile {}", profile.name);
            println!("  BMR: {} kcal/day", format_kcal(profile.bmr));
            println!("  id: {}", profile.id);
            Ok(())
        }

        ProfileAction::Edit {
            profile,
            name,
            age,
            gender,
            height,
            weight,
        } => {
            let updated = update_profiles(repo, |store| {
                let id = resolve_profile(store, &profile)?;
                let current = store
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| Error::NotFound(id.clone()))?;

                let metrics = Metrics {
                    age: age.unwrap_or(current.metrics.age),
                    gender: gender.unwrap_or(current.metrics.gender),
                    height: height.unwrap_or(current.metrics.height),
                    weight: weight.unwrap_or(current.metrics.weight),
                };
                let name = name.as_deref().unwrap_or(&current.name);
                store.update(&id, metrics, name)
            })?;

            println!("✓ Updated profile {}", updated.name);
            println!("  BMR: {} kcal/day", format_kcal(updated.bmr));
            Ok(())
        }

        ProfileAction::Rm { profile } => {
            let name = update_profiles(repo, |store| {
                let id = resolve_profile(store, &profile)?;
                let name = store.get(&id).map(|p| p.name.clone()).unwrap_or_default();
                store.remove(&id)?;
                Ok(name)
            })?;

            println!("✓ Deleted profile {}", name);
            Ok(())
        }

        ProfileAction::Select { profile } => {
            let active = update_profiles(repo, |store| {
                let id = resolve_profile(store, &profile)?;
                if store.selected_id() == Some(&id) {
                    store.select(None)?;
                } else {
                    store.select(Some(&id))?;
                }
                Ok(store.selected().map(|p| p.name.clone()))
            })?;

            match active {
                Some(name) => println!("✓ Active profile: {}", name),
                None => println!("✓ Profile deselected"),
            }
            Ok(())
        }

        ProfileAction::Deselect => {
            update_profiles(repo, |store| store.select(None))?;
            println!("✓ Profile deselected");
            Ok(())
        }
    }
}

fn cmd_show(repo: &JsonFileRepository) -> Result<()> {
    let store = repo.load_profiles()?;

    match store.selected() {
        Some(profile) => {
            println!("Active profile: {}", profile.name);
            println!("  {}", describe_metrics(&profile.metrics));
            println!(
                "  Basal Metabolic Rate (BMR): {} kcal/day",
                format_kcal(profile.bmr)
            );
        }
        None => {
            println!("No profile selected.");
            if store.is_empty() {
                println!("Create one with: bmrp profile add --name <NAME>");
            }
        }
    }
    Ok(())
}

fn cmd_advice(
    repo: &JsonFileRepository,
    goal: &str,
    preferences: &str,
    language: Language,
) -> Result<()> {
    let store = repo.load_profiles()?;
    let request = store.advice_request(goal, preferences, language)?;

    println!("System instruction:");
    println!("  {}", request.system_instruction());
    println!();
    println!("Prompt:");
    println!("  {}", request.prompt());
    Ok(())
}

fn cmd_analyze(response: &Path, language: Language) -> Result<()> {
    let text = std::fs::read_to_string(response)?;
    let analysis = parse_food_analysis(&text, language);

    match analysis.estimated_calories {
        Some(kcal) => println!("Estimated calories: {} kcal", format_kcal(kcal)),
        None => println!("Estimated calories: unavailable"),
    }
    println!();
    println!("Evaluation:");
    println!("  {}", analysis.evaluation);
    println!();
    println!("Advice:");
    println!("  {}", analysis.advice);
    Ok(())
}

fn display_profiles(store: &ProfileStore) {
    if store.is_empty() {
        println!("No profiles yet.");
        return;
    }

    for (index, profile) in store.list().iter().enumerate() {
        let marker = if store.selected_id() == Some(&profile.id) {
            "  [active]"
        } else {
            ""
        };
        println!(
            "{}. {}  BMR {} kcal/day{}",
            index + 1,
            profile.name,
            format_kcal(profile.bmr),
            marker
        );
        println!("   {}", describe_metrics(&profile.metrics));
        println!("   id: {}", profile.id);
    }

    if store.is_full() {
        println!();
        println!("Maximum of {} profiles reached.", MAX_PROFILES);
    }
}

fn describe_metrics(metrics: &Metrics) -> String {
    format!(
        "{} years, {}, {} cm, {} kg",
        metrics.age, metrics.gender, metrics.height, metrics.weight
    )
}

/// Resolve an id, list position, or unique id prefix
///
/// A purely numeric argument that is not an exact id is only ever a
/// list position.
fn resolve_profile(store: &ProfileStore, arg: &str) -> Result<ProfileId> {
    let arg = arg.trim();
    let profiles = store.list();

    if let Some(p) = profiles.iter().find(|p| p.id.as_str() == arg) {
        return Ok(p.id.clone());
    }

    if let Ok(position) = arg.parse::<usize>() {
        return position
            .checked_sub(1)
            .and_then(|index| profiles.get(index))
            .map(|p| p.id.clone())
            .ok_or_else(|| Error::NotFound(ProfileId::from(arg)));
    }

    let mut matches = profiles.iter().filter(|p| p.id.as_str().starts_with(arg));
    match (matches.next(), matches.next()) {
        (Some(p), None) if !arg.is_empty() => Ok(p.id.clone()),
        (Some(_), Some(_)) => Err(Error::Other(format!(
            "Profile id prefix '{}' is ambiguous",
            arg
        ))),
        _ => Err(Error::NotFound(ProfileId::from(arg))),
    }
}
