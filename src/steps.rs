/// Instructions shown between the record button and the code preview
pub const STEPS: [&str; 4] = [
    "Enter the URL of the page you want to start recording from",
    "Click Start Recording and interact with the browser window that opens",
    "Close the browser window when the journey is complete; Stop Recording discards it",
    "Review the generated script below, then copy or export it",
];

pub fn render() -> String {
    STEPS
        .iter()
        .enumerate()
        .map(|(i, step)| format!("  {}. {}\n", i + 1, step))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_are_numbered_in_order() {
        let rendered = render();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), STEPS.len());
        assert!(lines[0].starts_with("  1. Enter the URL"));
        assert!(lines[2].starts_with("  3. Close the browser window"));
        assert!(lines[2].ends_with("Stop Recording discards it"));
        assert!(lines[3].starts_with("  4. Review"));
    }
}
