//! Prompt builders for the Research and Write stages.

/// Turn raw search results into organised research notes
pub fn research_prompt(topic: &str, search_results: &str) -> String {
    format!(
        "You are a Lead Researcher. Analyze this request: {topic}

Research data gathered from external sources:
{search_results}

Produce well-structured research notes covering:
1. Key Facts: the most important factual points about the topic.
2. Important Statistics: figures, market sizes, growth rates.
3. Current Trends: what is happening in this space right now.
4. Key Insights: deeper observations or expert opinions.
5. Potential Article Angles: two or three compelling directions for an article.

Do NOT write the article. Return organised notes only, comprehensive and specific."
    )
}

/// First draft, built from the research notes only
pub fn draft_prompt(topic: &str, research_notes: &str) -> String {
    format!(
        "You are a Senior Editor. Write a blog post based on the research notes below.

Topic: {topic}

Research Notes:
{research_notes}

The post should:
1. Open with an introduction that hooks the reader.
2. Cover the key aspects of the research under clear headings.
3. Weave in relevant statistics and facts naturally.
4. Offer practical takeaways.
5. Close with a conclusion summarising the main points.

Format the output in Markdown. Aim for roughly 600-900 words."
    )
}

/// Revision of an existing draft against reviewer feedback
pub fn revision_prompt(topic: &str, research_notes: &str, draft: &str, feedback: &str) -> String {
    format!(
        "You are a Senior Editor revising your draft after review.

Topic: {topic}

Research Notes:
{research_notes}

Previous Draft:
{draft}

Reviewer Feedback: {feedback}

Revise the draft so that it fully addresses the feedback. Keep the tone professional and \
engaging and the structure clear. Format the output in Markdown with headings and sections."
    )
}
