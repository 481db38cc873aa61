//! Prompt construction for the translator and grammar passes.
//!
//! Values are spliced in as-is: the metadata is already JSON and the
//! dictionary is a list of `"src" : "tgt".` fragments the model reads as text.

use harmonydoc_kb::TermMatch;

/// `"src" : "tgt".\n` per match, joined with `;`. Empty when nothing matched.
pub fn render_knowledge(matches: &[TermMatch]) -> String {
    matches
        .iter()
        .map(|m| format!("\"{}\" : \"{}\".\n", m.source_term, m.target_term))
        .collect::<Vec<_>>()
        .join(";")
}

pub fn translator_prompt(tags: &str, official: &str, knowledge: &str, name: &str) -> String {
    format!(
        r#"
You are a HarmonyOS API Comment Translator.
You will receive one JSON input and must generate exactly one English API comment in a single line.

Instructions:
1. Analyze the API name and its "title" (e.g., "GetOrCreateLocalDir" → split into ["Get", "Or", "Create", "Local", "Dir"]) to select its technical terms that can be used in comment.
2. Use "API_Tags" to understand API information.
3. If "@enum" exists, the comment must describe an enumeration.
4. If "@type" exists with a data type (e.g., "Boolean", "Object"), describe only the variable's meaning (not its actions). Apply the corresponding datatype template when available.
5. Always use terms from "Translation_Dictionary" exactly as they appear.
6. Output format: One single-line English sentence. No other text.

JSON input:
{{
  "API_Metadata": {{
    "API_Tags": {tags},
    "Chinese_Comment": {official}
  }},
  "Translation_Dictionary": {knowledge},
  "API_Name": {name},
}}

Comment Constraints: {{
  "@function_category": {{
    "Field Function": {{
      "if exist": [
        "The comment must describe only the semantic meaning of the field or state.",
        "The comment must not describe any action, execution, or side effect.",
        "Verbs implying behavior (e.g., perform, execute, trigger, handle) must not be used."
      ]
    }},
    "Utility Function": {{
      "if exist": [
        "The comment must describe the functional purpose of the utility.",
        "The comment may describe computation, conversion, or assistance behavior.",
        "The comment must not describe lifecycle events or callback invocation."
      ]
    }},
    "Callback Function": {{
      "if exist": [
        "The comment must describe when or under what condition the callback is invoked.",
        "The comment must emphasize the triggering context rather than internal logic.",
        "The comment must not describe the function as being actively called by users."
      ]
    }}
  }},
  "@enum": {{
    "if exist": "The comment must explicitly mention that this API represents an enumeration."
  }},
  "@type or @typedef": {{
    "if exist": {{
      "datatype_templates": {{
        "Boolean": "Indicates whether {{X}}.",
        "Integer": "Represents the {{X}} value.",
        "String": "Represents the {{X}} string.",
        "Object": "Represents information about {{X}}.",
        "Enum": "Represents the {{X}} enumeration."
      }}
    }}
  }}
}}
"#
    )
}

pub fn grammar_prompt(comment: &str) -> String {
    format!(
        r#"
You are a Code Comment Grammar Correction Specialist.
Your task is to receive one English comment and output a single-line corrected version that follows all grammar and formatting rules.

Instructions:
1. **Articles**: Insert missing "a", "an", or "the" wherever grammatically needed, including before technical terms.
2. **Capitalization**: The first word must be capitalized; all other words are lowercase, even technical terms.
3. **Punctuation**: Each comment must end with a period.
4. **Noun Phrasing**: Avoid stacked nouns; rewrite them using possessive or "of" forms. Example: "atomic service module name" → "the module name of the atomic service."
5. **Agreement & Consistency**: Fix subject-verb agreement and plural/singular mismatches.
6. **Output format**: One single-line corrected English sentence only.

JSON input:
{{
  "Input_Comment": {comment},
  "Constraints": {{
    "Articles": "Check and insert missing articles",
    "Capitalization": {{ "SentenceStart": "Must capitalize", "InsideSentence": "Lowercase only" }},
    "Punctuation": "Every comment ends with a period",
    "Noun_Phrasing": "Rewrite noun stacks into possessive/of phrases",
    "Agreement": "Fix subject-verb and plural issues",
    "Format": "Keep tags and technical identifiers unchanged"
  }}
}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tm(s: &str, t: &str) -> TermMatch {
        TermMatch {
            source_term: s.to_string(),
            target_term: t.to_string(),
        }
    }

    #[test]
    fn knowledge_fragments() {
        assert_eq!(render_knowledge(&[]), "");
        assert_eq!(
            render_knowledge(&[tm("文件", "file"), tm("目录", "directory")]),
            "\"文件\" : \"file\".\n;\"目录\" : \"directory\".\n"
        );
    }

    #[test]
    fn translator_prompt_splices_every_field() {
        let p = translator_prompt(r#"{"kit":"CoreFileKit"}"#, "打开文件", "\"文件\" : \"file\".\n", "openFile");
        assert!(p.contains(r#""API_Tags": {"kit":"CoreFileKit"}"#));
        assert!(p.contains("\"Chinese_Comment\": 打开文件"));
        assert!(p.contains("\"API_Name\": openFile"));
        assert!(p.contains("Indicates whether {X}."));
    }

    #[test]
    fn grammar_prompt_carries_comment() {
        let p = grammar_prompt("atomic service module name");
        assert!(p.contains("\"Input_Comment\": atomic service module name,"));
        assert!(p.starts_with("\nYou are a Code Comment Grammar Correction Specialist."));
    }
}
