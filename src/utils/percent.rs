/// Render a completion fraction as a percentage with two decimals
pub fn format_percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}
