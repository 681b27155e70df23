use clap::Parser;
use larder::{
    DataDir,
    Library,
    error,
    library::Conversion,
    recipe::{MetadataField, Recipe, RecipeId},
};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Command};

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("LARDER_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();

    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    init_tracing(cli.verbose, cli.quiet);

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let library = Library::open(data_dir)?;

    match cli.command {
        Command::Index => {
            let report = library.build_index()?;
            eprintln!(
                "Indexed {} recipe(s), {} unchanged, {} failed, {} removed.",
                report.indexed, report.unchanged, report.failed, report.pruned
            );
        }
        Command::Search(args) => {
            let query = args.query();
            let results = match args.count {
                Some(count) => library.search_with_limit(&query, count)?,
                None => library.search(&query)?,
            };

            if args.json {
                print_json(&results)?;
            } else if results.recipes.is_empty() {
                println!("No recipes match '{query}'");
            } else {
                for recipe in &results.recipes {
                    println!("{}\t{}", recipe.id, recipe.title);
                }
                if results.total > results.recipes.len() {
                    println!(
                        "\nShowing {} of {} matches",
                        results.recipes.len(),
                        results.total
                    );
                }
            }
        }
        Command::Stats(args) => {
            let stats = library.compute_statistics()?;
            if args.json {
                print_json(&stats)?;
            } else {
                println!(
                    "The library contains {} recipes with a total size of {:.1} kiB.",
                    stats.count,
                    stats.total_bytes as f64 / 1024.0
                );
            }
        }
        Command::Render(args) => {
            let summary = if args.ids.is_empty() {
                library.render_all()?
            } else {
                let ids = args
                    .ids
                    .into_iter()
                    .map(RecipeId::new)
                    .collect::<error::Result<Vec<_>>>()?;
                library.render_many(ids)?
            };
            eprintln!(
                "Rendered {} recipe(s), {} up to date, {} missing, {} failed.",
                summary.rendered,
                summary.up_to_date,
                summary.missing,
                summary.failed
            );
        }
        Command::Remove { id } => {
            library.remove_from_index(&RecipeId::new(id.as_str())?)?;
            println!("Removed '{id}' from the index");
        }
        Command::Show(args) => {
            let recipe = library.show(&RecipeId::new(args.id)?)?;
            if args.json {
                print_json(&recipe)?;
            } else {
                print_recipe(&recipe);
            }
        }
        Command::Convert(args) => {
            for conversion in library.convert(args.write)? {
                match conversion {
                    Conversion::Converted { id, yaml } => {
                        if args.write {
                            println!("Converted '{id}'");
                        } else {
                            println!("--- {id} ---\n{yaml}");
                        }
                    }
                    Conversion::NoIngredients { id } => {
                        eprintln!(
                            "Skipping '{id}': no ingredient list, convert it by hand"
                        );
                    }
                }
            }
        }
        Command::Completions(_) => {}
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> error::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

fn print_recipe(recipe: &Recipe) {
    println!("# {}", recipe.title);
    for field in MetadataField::ALL {
        if let Some(value) = recipe.metadata.get(field)
            && !value.is_empty()
        {
            println!("{}: {value}", field.key());
        }
    }
    if !recipe.tags.is_empty() {
        println!("tags: {}", recipe.tags.join(", "));
    }

    for (i, step) in recipe.steps.iter().enumerate() {
        if recipe.steps.len() > 1 {
            println!("\n## Step {}", i + 1);
        }
        if !step.ingredients.is_empty() {
            println!();
            for ingredient in &step.ingredients {
                println!("* {ingredient}");
            }
        }
        let instructions = step.instructions.trim();
        if !instructions.is_empty() {
            println!("\n{instructions}");
        }
    }
}
