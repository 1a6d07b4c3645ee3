//! The `promptgrade init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create promptgrade.toml
    if std::path::Path::new("promptgrade.toml").exists() {
        println!("promptgrade.toml already exists, skipping.");
    } else {
        std::fs::write("promptgrade.toml", SAMPLE_CONFIG)?;
        println!("Created promptgrade.toml");
    }

    // Create example function definition
    std::fs::create_dir_all("functions")?;
    let example_path = std::path::Path::new("functions/calculus.toml");
    if example_path.exists() {
        println!("functions/calculus.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_DEFINITION)?;
        println!("Created functions/calculus.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit promptgrade.toml with your API keys");
    println!("  2. Run: promptgrade validate --definition functions/calculus.toml");
    println!("  3. Run: promptgrade create --definition functions/calculus.toml");
    println!("  4. Run: promptgrade evaluate --function calculus-qa");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# promptgrade configuration

default_provider = "openai"
grading_model = "gpt-4o-mini"
grading_parallelism = 3
request_timeout_secs = 60
store_dir = "./promptgrade-data"
owner = "default"

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[providers.ollama]
type = "ollama"
base_url = "http://localhost:11434"
"#;

const EXAMPLE_DEFINITION: &str = r#"# An example promptgrade function definition.
#
# The output schema's `metrics` lists name the qualitative properties each
# value is graded on; every evaluation scores them 0-100.

name = "calculus-qa"
task = "Answer calculus questions precisely and concisely"
kind = "completion"

[parameters]
prompt = "You are a calculus tutor. Answer the question directly, without filler."
model = "gpt-4o-mini"
temperature = 0.2

[input_schema]
type = "object"

[input_schema.properties.Question]
type = "string"

[output_schema]
type = "object"

[output_schema.properties.Answer]
type = "string"
metrics = ["Correctness", "Concision"]

[[test_set]]
input = { Question = "What is the derivative of sin(x)?" }

[[test_set]]
input = { Question = "What is the integral of 1/x?" }

[[test_set]]
input = { Question = "Differentiate x^x with respect to x." }
"#;
