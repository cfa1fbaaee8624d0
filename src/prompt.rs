//! Grounded answer prompt.

/// Placed between retrieved chunks in the `CONTEXT:` section.
pub const CONTEXT_SEPARATOR: &str = "\n---\n";

const INSTRUCTIONS: &str = "\
You are a helpful company policy assistant.
Your task is to answer the user's question based *only* on the provided context.
Do not use any external knowledge.
If the answer is not found in the context, state that you cannot find the information in the policies.";

/// Build the single prompt sent to the generator for one turn.
pub fn build_prompt<S: AsRef<str>>(context_chunks: &[S], question: &str) -> String {
    let context = context_chunks
        .iter()
        .map(|c| c.as_ref())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);

    format!(
        "{}\n\nCONTEXT:\n{}\n\nQUESTION:\n{}\n\nANSWER:\n",
        INSTRUCTIONS, context, question
    )
}
