/// Explain one prediction with both methods and save the charts
///
/// Run with:
/// ```
/// cargo run --example explain --features bert,auto-download -- "This is terrible."
/// ```
use xai_fundamentals::api::Explorer;
use xai_fundamentals::chart::Chart;
use xai_fundamentals::config::Config;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let text = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "I love this product!".to_string());

    let mut config = Config::load_or_default("xai.toml")?;
    config.lime.seed.get_or_insert(42);
    let explorer = Explorer::with_config(config)?;

    println!("Text: \"{}\"", text);
    println!("Sentiment: {}\n", explorer.classify(&text)?);

    let (shap, waterfall) = explorer.explain_shap(&text)?;
    print!("{}", shap.record);
    println!(
        "base {:.3} + contributions {:.3} = output {:.3}\n",
        shap.base_value,
        shap.record.total(),
        shap.output_value
    );
    std::fs::write("shap_waterfall.svg", waterfall.to_svg())?;

    let lime = explorer.explain_lime(&text)?;
    print!("{}", lime.record);
    println!("surrogate R² {:.3}\n", lime.score);
    let (features, values) = lime.record.split();
    std::fs::write("lime_bars.svg", explorer.render_lime(&features, &values)?.to_svg())?;

    println!("✓ Charts written to shap_waterfall.svg and lime_bars.svg");
    Ok(())
}
