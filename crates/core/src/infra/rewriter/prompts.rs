//! メールリライト用プロンプトテンプレート

use crate::domain::types::StyleProfile;

/// システムプロンプト: 役割と制約を固定する
pub const SYSTEM_PROMPT: &str = "\
You are a helpful assistant that rewrites email drafts to match a user style profile.
You only rewrite the text you are given. You never reply to the email, never add
commentary, and never change what the message says.";

/// 長さの許容幅のデフォルト（±%）
pub const DEFAULT_LENGTH_TOLERANCE_PCT: u8 = 25;

/// スタイルプロファイルからユーザープロンプトを決定的に構築する
pub fn build_prompt(original: &str, style: &StyleProfile, length_tolerance_pct: u8) -> String {
    let mut user_msg = String::new();

    user_msg.push_str("Rewrite the following email to match this style.\n");
    user_msg.push_str(&format!("Tone: \"{}\"\n", style.tone));
    if let Some(signature) = &style.signature {
        user_msg.push_str(&format!("Signature: \"{signature}\"\n"));
    }
    if let Some(extra) = &style.custom_instructions {
        user_msg.push_str(&format!("Additional instructions: {extra}\n"));
    }

    user_msg.push_str("Rules:\n");
    user_msg.push_str("- Preserve all facts and intent of the original.\n");
    user_msg.push_str(&format!(
        "- Keep length within ±{length_tolerance_pct}% of the original \
         unless the instructions explicitly ask to shorten or lengthen it.\n"
    ));
    user_msg.push_str("- Do not invent new facts.\n");
    user_msg.push_str(
        "- Preserve technical details (names, numbers, dates, links, code) verbatim.\n",
    );
    user_msg.push_str("- Return only the rewritten email text (no commentary).\n");

    user_msg.push_str("Original message:\n\"\"\"");
    user_msg.push_str(original);
    user_msg.push_str("\"\"\"\n");

    user_msg
}
