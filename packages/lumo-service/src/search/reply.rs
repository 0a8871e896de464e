pub(crate) const NO_KEYWORDS_REPLY: &str = "关键词过少或过于宽泛，请提供更具体的描述再试试～";

pub(crate) struct ReplyContext<'a> {
	pub(crate) count: usize,
	pub(crate) fallback_ran: bool,
	pub(crate) used_expansion: bool,
	pub(crate) expanded_keywords: &'a [String],
	pub(crate) display_keyword: &'a str,
}

pub(crate) fn compose(ctx: &ReplyContext<'_>) -> String {
	let count = ctx.count;

	if ctx.fallback_ran {
		return format!(
			"元数据命中较少，我补充了关键词扩展并用 AI 分析内容，最终找到 {count} 张可能相关的图片。"
		);
	}
	if ctx.used_expansion {
		return format!(
			"我为你扩展了搜索词（如：{}），共找到 {count} 张相关图片。",
			ctx.expanded_keywords.join("、")
		);
	}

	format!("我帮你找到了 {count} 张与「{}」相关的图片。", ctx.display_keyword)
}
