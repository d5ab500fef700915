use crate::models::generation::GenerationParams;

const OUTPUT_SCHEMA: &str = r#"{
  "title": "short title of the test",
  "questions": [
    {
      "text": "question text",
      "is_closed": true,
      "difficulty": 1,
      "choices": ["answer A", "answer B", "answer C", "answer D"],
      "correct_choices": ["answer B"]
    },
    {
      "text": "open question text",
      "is_closed": false,
      "difficulty": 3,
      "choices": null,
      "correct_choices": null
    }
  ]
}"#;

/// Builds the instruction sent to the generative model. Pure function of its
/// inputs: the same text and parameters always give the same prompt.
pub fn build_prompt(source_text: &str, params: &GenerationParams) -> String {
    let closed = params.closed();
    let difficulty = params.difficulty();

    let mut parts = vec![
        "You are an experienced educator preparing a written test.".to_string(),
        "Write every question and every answer in the same language as the source text below."
            .to_string(),
        format!(
            "Based on the source text, create exactly {} closed questions and exactly {} open questions ({} questions in total).",
            closed.total(),
            params.num_open(),
            params.total_questions()
        ),
    ];

    if closed.total() > 0 {
        let mut kinds = Vec::new();
        if closed.true_false > 0 {
            kinds.push(format!(
                "- {} true/false questions: choices are exactly [\"True\", \"False\"] and correct_choices holds one of them",
                closed.true_false
            ));
        }
        if closed.single_choice > 0 {
            kinds.push(format!(
                "- {} single-choice questions: 3 to 5 choices, exactly one correct choice",
                closed.single_choice
            ));
        }
        if closed.multi_choice > 0 {
            kinds.push(format!(
                "- {} multiple-choice questions: 4 to 6 choices, at least two correct choices",
                closed.multi_choice
            ));
        }
        parts.push(format!("Closed questions must be split as follows:\n{}", kinds.join("\n")));
    }

    parts.push(format!(
        "Distribute difficulty as follows: {} easy (difficulty 1), {} medium (difficulty 2), {} hard (difficulty 3).",
        difficulty.easy, difficulty.medium, difficulty.hard
    ));
    parts.push("Also propose a short, descriptive title for the whole test.".to_string());
    parts.push(format!(
        "Return a single JSON object with exactly this structure:\n{}\n\
         Rules: \"difficulty\" is 1, 2 or 3. For closed questions \"choices\" lists every answer option \
         and \"correct_choices\" repeats the correct options verbatim. For open questions both \"choices\" \
         and \"correct_choices\" are null.",
        OUTPUT_SCHEMA
    ));
    parts.push(
        "Return ONLY that JSON object. Do not add comments, explanations, markdown or any other text."
            .to_string(),
    );
    parts.push(format!("Source text:\n\"\"\"\n{}\n\"\"\"", source_text));

    parts.join("\n\n")
}
