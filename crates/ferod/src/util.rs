/// Upper-case the first letter of every `separator`-delimited word
///
/// ```
/// assert_eq!(ferod::util::to_pascal_case("server admin", " "), "Server Admin");
/// ```
pub fn to_pascal_case(input: &str, separator: &str) -> String {
    input
        .split(separator)
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_pascal_case() {
        assert_eq!(to_pascal_case("utility", " "), "Utility");
        assert_eq!(to_pascal_case("bot admin tools", " "), "Bot Admin Tools");
        assert_eq!(to_pascal_case("bot-admin", "-"), "Bot-Admin");
        assert_eq!(to_pascal_case("already Fine", " "), "Already Fine");
        assert_eq!(to_pascal_case("", " "), "");
        assert_eq!(to_pascal_case("double  space", " "), "Double  Space");
        assert_eq!(to_pascal_case("émoji", " "), "Émoji");
    }
}
