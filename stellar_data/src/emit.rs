/// C float literal with one to eight decimals, e.g. `1.0f`, `0.70710678f`.
/// Callers pass finite values; the point and number setters reject the rest.
pub fn c_float(value: f64) -> String {
    let mut text = format!("{value:.8}");
    while text.ends_with('0') && !text.ends_with(".0") {
        text.pop();
    }
    if text == "-0.0" {
        text.remove(0);
    }
    text.push('f');
    text
}
