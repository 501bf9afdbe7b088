/// Builds the static guidance sent when a session opens. The limit travels
/// inside the instruction text, not as a structured parameter; nothing
/// downstream enforces that the service honors it, and the accepted palette
/// list is never truncated to it.
pub fn build_instructions(limit: u8) -> String {
    format!(
        "Generate a smooth gradient color palette based on the user's prompt. \
         The gradient should transition between two or more colors relevant to \
         the theme, mood, or elements described in the prompt. Limit the result \
         to only {limit} palettes. Respond with a JSON array of objects, each \
         with an integer \"id\", a short \"name\" for the gradient, and \
         \"colors\" as an array of hex color strings."
    )
}
