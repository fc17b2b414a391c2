pub fn render_schema(listing_relation: &str) -> String {
	let init = include_str!("../../../sql/init.sql");
	let expanded = expand_includes(init);

	expanded.replace("<LISTING_RELATION>", listing_relation)
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_user_shortlists.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_user_shortlists.sql")),
				"tables/002_tender_recommendations.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_tender_recommendations.sql")),
				"functions/010_recommended_tenders_with_count.sql" => out.push_str(include_str!(
					"../../../sql/functions/010_recommended_tenders_with_count.sql"
				)),
				"functions/011_shortlisted_tenders_json.sql" => out
					.push_str(include_str!("../../../sql/functions/011_shortlisted_tenders_json.sql")),
				_ => {
					out.push_str(line);
					out.push('\n');
				},
			}

			out.push('\n');

			continue;
		}

		out.push_str(line);
		out.push('\n');
	}

	out
}
