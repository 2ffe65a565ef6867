//! Prompt templates wrapped around caller input.

/// Probe sent to the fallback model once the regular path is exhausted.
pub const FALLBACK_PROBE_PROMPT: &str = "Hello, are you working?";

/// Probe sent by the health check.
pub const HEALTH_PROBE_PROMPT: &str = "Hello, respond with 'OK' if you are working.";

/// Token the health probe answer must contain (case-insensitive).
pub const HEALTH_ACK_TOKEN: &str = "ok";

pub fn code_prompt(prompt: &str) -> String {
    format!(
        "\nYou are an expert programmer. Generate clean, well-documented, and efficient code for the following request:\n\
         \n\
         {prompt}\n\
         \n\
         Requirements:\n\
         - Include proper error handling\n\
         - Add meaningful comments\n\
         - Follow best practices\n\
         - Provide working, production-ready code\n\
         - Include usage examples if applicable\n\
         \n\
         Code:"
    )
}

pub fn search_prompt(query: &str) -> String {
    format!(
        "\nProvide a comprehensive answer for the search query: \"{query}\"\n\
         \n\
         Include:\n\
         - Direct answer to the question\n\
         - Key facts and details\n\
         - Relevant context and background\n\
         - Multiple perspectives if applicable\n\
         - Recent developments if relevant\n\
         \n\
         Answer:"
    )
}

/// Answer prompt grounded on fetched search results.
pub fn search_answer_prompt(query: &str, context: &str) -> String {
    format!(
        "Based on the following search results, provide a comprehensive answer to: \"{query}\"\n\nSearch Results:\n{context}"
    )
}

/// Used by the image route when no image was attached.
pub fn image_text_prompt(prompt: &str) -> String {
    format!("Regarding images and the following request: {prompt}")
}

/// True when `text` contains the acknowledgement anywhere, ignoring case.
/// Substring match: "OKAY" and "Looking good" both count.
pub fn contains_ack(text: &str) -> bool {
    text.to_lowercase().contains(HEALTH_ACK_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_prompt_embeds_request_verbatim() {
        let p = "fn main() { println!(\"{}\", 1 + 1); }";
        let wrapped = code_prompt(p);
        assert!(wrapped.contains(p));
        assert!(wrapped.contains("Include usage examples if applicable"));
        assert!(wrapped.ends_with("Code:"));
    }

    #[test]
    fn search_prompt_quotes_query() {
        assert!(search_prompt("rust async").contains("\"rust async\""));
        let answer = search_answer_prompt("q", "Title: a\nSnippet: b\n\n");
        assert!(answer.ends_with("Search Results:\nTitle: a\nSnippet: b\n\n"));
    }

    #[test]
    fn ack_detection() {
        assert!(contains_ack("OK, I am working."));
        assert!(contains_ack("ok"));
        assert!(contains_ack("Yes. Ok!"));
        assert!(contains_ack("OKAY, working"));
        assert!(contains_ack("Looking good"));
        assert!(!contains_ack("I am broken"));
        assert!(!contains_ack("I am here."));
        assert!(!contains_ack(""));
    }
}
