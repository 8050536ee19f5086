/// Simple example of classifying text with xai-fundamentals
///
/// Run with:
/// ```
/// cargo run --example simple --features bert,auto-download
/// ```
use xai_fundamentals::api::Explorer;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("XAI Fundamentals - Simple Example\n");

    // Load the model (will auto-download if not found and feature is enabled)
    println!("Loading model...");
    let explorer = Explorer::new()?;
    println!("✓ Model loaded on: {}\n", explorer.device());

    let examples = vec![
        "I love this product!",
        "This is terrible.",
        "The plot was thin, but the acting carried it.",
        "",
    ];

    println!("{}", "=".repeat(70));
    for text in examples {
        let prediction = explorer.predict(text)?;
        println!("\nText: \"{}\"", text);
        println!(
            "Sentiment: {} (confidence: {:.1}%)",
            prediction.label,
            prediction.confidence() * 100.0
        );
    }
    println!("\n{}", "=".repeat(70));

    Ok(())
}
