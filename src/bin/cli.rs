use polars::prelude::*;
use std::io::{self, Write};
use team_planner::model::parse_lenient_hours;
use team_planner::{
    Assignment, AssignmentKey, DataProduct, EngineConfig, Label, Person, Planner, Role,
    RoleRequirement, TeamResult, UtilizationFilter, data_product_staffing,
    data_product_staffing_frame, export_assignments_csv, export_persons_csv,
    import_assignments_csv, import_persons_csv, load_planner_from_json, person_utilization,
    role_coverage, role_coverage_frame, save_planner_to_json, utilization_frame,
};
use tracing_subscriber::EnvFilter;

fn cell_text(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::Float64(v) => format_hours(*v),
        AnyValue::Boolean(v) => if *v { "yes" } else { "no" }.to_string(),
        other => other.to_string(),
    }
}

fn format_hours(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn render_df_as_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();
    let mut cells: Vec<Vec<String>> = Vec::with_capacity(df.height());
    for row_idx in 0..df.height() {
        cells.push(
            columns
                .iter()
                .map(|col| col.get(row_idx).map(|av| cell_text(&av)).unwrap_or_default())
                .collect(),
        );
    }

    let mut widths: Vec<usize> = names.iter().map(|n| n.len()).collect();
    for row in &cells {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.len());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(w + 2));
        sep.push('+');
    }

    let render_row = |row: &[String]| {
        let mut line = String::from("|");
        for (ci, cell) in row.iter().enumerate() {
            line.push(' ');
            line.push_str(cell);
            line.push_str(&" ".repeat(widths[ci].saturating_sub(cell.len())));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&names));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in &cells {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn print_frame(frame: PolarsResult<DataFrame>) {
    match frame {
        Ok(df) => println!("{}", render_df_as_text_table(&df)),
        Err(e) => println!("Error rendering table: {}", e),
    }
}

fn persons_frame(planner: &Planner) -> PolarsResult<DataFrame> {
    let persons = planner.persons();
    let ids: Vec<&str> = persons.iter().map(|p| p.id.as_str()).collect();
    let names: Vec<&str> = persons.iter().map(|p| p.name.as_str()).collect();
    let hours: Vec<f64> = persons.iter().map(|p| p.capacity()).collect();
    let labels: Vec<String> = persons
        .iter()
        .map(|p| p.label_ids.iter().cloned().collect::<Vec<_>>().join(";"))
        .collect();
    DataFrame::new(vec![
        Series::new(PlSmallStr::from_static("id"), ids).into_column(),
        Series::new(PlSmallStr::from_static("name"), names).into_column(),
        Series::new(PlSmallStr::from_static("weekly_hours"), hours).into_column(),
        Series::new(PlSmallStr::from_static("labels"), labels).into_column(),
    ])
}

fn roles_frame(planner: &Planner) -> PolarsResult<DataFrame> {
    let roles = planner.roles();
    let ids: Vec<&str> = roles.iter().map(|r| r.id.as_str()).collect();
    let names: Vec<&str> = roles.iter().map(|r| r.name.as_str()).collect();
    let colors: Vec<&str> = roles.iter().map(|r| r.color.as_str()).collect();
    DataFrame::new(vec![
        Series::new(PlSmallStr::from_static("id"), ids).into_column(),
        Series::new(PlSmallStr::from_static("name"), names).into_column(),
        Series::new(PlSmallStr::from_static("color"), colors).into_column(),
    ])
}

fn products_frame(planner: &Planner) -> PolarsResult<DataFrame> {
    let products = planner.data_products();
    let ids: Vec<&str> = products.iter().map(|d| d.id.as_str()).collect();
    let names: Vec<&str> = products.iter().map(|d| d.name.as_str()).collect();
    DataFrame::new(vec![
        Series::new(PlSmallStr::from_static("id"), ids).into_column(),
        Series::new(PlSmallStr::from_static("name"), names).into_column(),
    ])
}

fn assignments_frame(planner: &Planner) -> PolarsResult<DataFrame> {
    let assignments = planner.assignments();
    let persons: Vec<&str> = assignments.iter().map(|a| a.person_id.as_str()).collect();
    let products: Vec<&str> = assignments
        .iter()
        .map(|a| a.data_product_id.as_str())
        .collect();
    let roles: Vec<&str> = assignments.iter().map(|a| a.role_id.as_str()).collect();
    let hours: Vec<f64> = assignments.iter().map(|a| a.hours).collect();
    let ended: Vec<Option<String>> = assignments
        .iter()
        .map(|a| a.ended_on.map(|d| d.to_string()))
        .collect();
    DataFrame::new(vec![
        Series::new(PlSmallStr::from_static("person_id"), persons).into_column(),
        Series::new(PlSmallStr::from_static("data_product_id"), products).into_column(),
        Series::new(PlSmallStr::from_static("role_id"), roles).into_column(),
        Series::new(PlSmallStr::from_static("hours"), hours).into_column(),
        Series::new(PlSmallStr::from_static("ended_on"), ended).into_column(),
    ])
}

fn team_frame(result: &TeamResult) -> PolarsResult<DataFrame> {
    let roles: Vec<&str> = result.team.iter().map(|m| m.role_name.as_str()).collect();
    let persons: Vec<&str> = result.team.iter().map(|m| m.person_name.as_str()).collect();
    let hours: Vec<f64> = result.team.iter().map(|m| m.hours).collect();
    let scores: Vec<f64> = result.team.iter().map(|m| m.score).collect();
    let fits: Vec<bool> = result.team.iter().map(|m| m.can_fulfill_hours).collect();
    let fallback: Vec<bool> = result.team.iter().map(|m| m.fallback).collect();
    DataFrame::new(vec![
        Series::new(PlSmallStr::from_static("role"), roles).into_column(),
        Series::new(PlSmallStr::from_static("person"), persons).into_column(),
        Series::new(PlSmallStr::from_static("hours"), hours).into_column(),
        Series::new(PlSmallStr::from_static("score"), scores).into_column(),
        Series::new(PlSmallStr::from_static("can_fulfill"), fits).into_column(),
        Series::new(PlSmallStr::from_static("fallback"), fallback).into_column(),
    ])
}

/// `role:hours` tokens. The last colon splits, so role ids may contain colons.
fn parse_requirements<'a>(tokens: impl Iterator<Item = &'a str>) -> Vec<RoleRequirement> {
    tokens
        .map(|token| match token.rsplit_once(':') {
            Some((role, hours)) => RoleRequirement::new(role, parse_lenient_hours(hours)),
            None => RoleRequirement::new(token, 0.0),
        })
        .collect()
}

fn rest_of_line<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts.collect::<Vec<_>>().join(" ")
}

fn print_help() {
    println!(
        "Commands:\n  help                                      Show this help\n  show persons|roles|products|assignments   Print a collection\n  person add <id> <hours|-> <name...>       Add a person (- keeps the default capacity)\n  person label <id> <label>                 Tag a person, creating the label if needed\n  role add <id> <color> <name...>           Add a role (#RRGGBB)\n  product add <id> <name...>                Add a data product\n  assign <person> <product> <role> <hours>  Add an assignment\n  unassign <person> <product> <role>        Remove an assignment\n  delete person|role|product <id>           Delete a record\n  recommend <role:hours>...                 Ranked candidates per requirement\n  team <role:hours>...                      Assemble a team\n  util                                      Person utilization\n  roles-usage                               Role coverage and data product staffing\n  fix-colors                                Reassign duplicated role colors\n  save json <path>                          Persist the planner\n  load json <path>                          Replace the planner from disk\n  export persons|assignments <path>         Write a CSV file\n  import persons|assignments <path>         Upsert from a CSV file\n  quit|exit                                 Exit"
    );
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let mut planner = Planner::new();
    let config = EngineConfig::default();

    println!("Team Planner (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "show" => match parts.next() {
                Some("persons") => print_frame(persons_frame(&planner)),
                Some("roles") => print_frame(roles_frame(&planner)),
                Some("products") => print_frame(products_frame(&planner)),
                Some("assignments") => print_frame(assignments_frame(&planner)),
                _ => println!("Usage: show persons|roles|products|assignments"),
            },
            "person" => match parts.next() {
                Some("add") => {
                    let id = parts.next();
                    let hours = parts.next();
                    let name = rest_of_line(&mut parts);
                    match (id, hours) {
                        (Some(id), Some(hours)) if !name.is_empty() => {
                            let mut person = Person::new(id, name);
                            if hours != "-" {
                                match hours.replace(',', ".").parse::<f64>() {
                                    Ok(h) => person.weekly_hours = Some(h),
                                    Err(_) => {
                                        println!("Invalid hours");
                                        continue;
                                    }
                                }
                            }
                            match planner.add_person(person) {
                                Ok(_) => println!("Person {id} added."),
                                Err(e) => println!("Error: {}", e),
                            }
                        }
                        _ => println!("Usage: person add <id> <hours|-> <name...>"),
                    }
                }
                Some("label") => match (parts.next(), parts.next()) {
                    (Some(id), Some(label)) => {
                        if planner.label(label).is_none() {
                            if let Err(e) = planner.add_label(Label::new(label, label)) {
                                println!("Error: {}", e);
                                continue;
                            }
                        }
                        match planner.tag_person(id, label) {
                            Ok(_) => println!("Person {id} labelled {label}."),
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    _ => println!("Usage: person label <id> <label>"),
                },
                _ => println!("Usage: person add|label ..."),
            },
            "role" => match (parts.next(), parts.next(), parts.next()) {
                (Some("add"), Some(id), Some(color)) => {
                    let name = rest_of_line(&mut parts);
                    if name.is_empty() {
                        println!("Usage: role add <id> <color> <name...>");
                        continue;
                    }
                    match planner.add_role(Role::new(id, name, color)) {
                        Ok(_) => println!("Role {id} added."),
                        Err(e) => println!("Error: {}", e),
                    }
                }
                _ => println!("Usage: role add <id> <color> <name...>"),
            },
            "product" => match (parts.next(), parts.next()) {
                (Some("add"), Some(id)) => {
                    let name = rest_of_line(&mut parts);
                    if name.is_empty() {
                        println!("Usage: product add <id> <name...>");
                        continue;
                    }
                    match planner.add_data_product(DataProduct::new(id, name)) {
                        Ok(_) => println!("Data product {id} added."),
                        Err(e) => println!("Error: {}", e),
                    }
                }
                _ => println!("Usage: product add <id> <name...>"),
            },
            "assign" => match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(person), Some(product), Some(role), Some(hours)) => {
                    let assignment =
                        Assignment::new(person, product, role, parse_lenient_hours(hours));
                    match planner.assign(assignment) {
                        Ok(_) => println!("Assigned {person} to {product} as {role}."),
                        Err(e) => println!("Error: {}", e),
                    }
                }
                _ => println!("Usage: assign <person> <product> <role> <hours>"),
            },
            "unassign" => match (parts.next(), parts.next(), parts.next()) {
                (Some(person), Some(product), Some(role)) => {
                    let key = AssignmentKey::new(person, product, role);
                    match planner.unassign(&key) {
                        Ok(_) => println!("Removed assignment {key}."),
                        Err(e) => println!("Error: {}", e),
                    }
                }
                _ => println!("Usage: unassign <person> <product> <role>"),
            },
            "delete" => {
                let result = match (parts.next(), parts.next()) {
                    (Some("person"), Some(id)) => planner.remove_person(id).map(|_| ("person", id)),
                    (Some("role"), Some(id)) => planner.remove_role(id).map(|_| ("role", id)),
                    (Some("product"), Some(id)) => {
                        planner.remove_data_product(id).map(|_| ("data product", id))
                    }
                    _ => {
                        println!("Usage: delete person|role|product <id>");
                        continue;
                    }
                };
                match result {
                    Ok((kind, id)) => println!("Deleted {kind} {id}."),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "recommend" => {
                let requirements = parse_requirements(&mut parts);
                match planner.recommendations(&requirements, &config) {
                    Ok(recommendations) => {
                        for rec in recommendations {
                            println!(
                                "{} ({}h): {} candidate(s)",
                                rec.role_name,
                                format_hours(rec.required_hours),
                                rec.candidates.len()
                            );
                            for (rank, candidate) in rec.candidates.iter().enumerate() {
                                println!(
                                    "  {}. {:<20} score {:>6.1}  match {:>3}  available {}h",
                                    rank + 1,
                                    candidate.person.name,
                                    candidate.score,
                                    candidate.role_match_score,
                                    format_hours(candidate.available_hours)
                                );
                            }
                        }
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "team" => {
                let requirements = parse_requirements(&mut parts);
                match planner.recommend(&requirements, &config) {
                    Ok(result) => {
                        print_frame(team_frame(&result));
                        println!(
                            "Total {}h, feasible: {}",
                            format_hours(result.total_hours),
                            if result.feasible { "yes" } else { "no" }
                        );
                        for unfilled in &result.unfilled {
                            println!(
                                "Unfilled: requirement {} ({})",
                                unfilled.position, unfilled.role_name
                            );
                        }
                        for person in result.double_booked() {
                            println!("Warning: {person} appears in more than one role");
                        }
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "util" => {
                let rows = person_utilization(planner.snapshot(), &UtilizationFilter::default());
                print_frame(utilization_frame(&rows));
            }
            "roles-usage" => {
                let roles = role_coverage(planner.snapshot());
                print_frame(role_coverage_frame(&roles));
                let products = data_product_staffing(planner.snapshot(), planner.data_products());
                print_frame(data_product_staffing_frame(&products));
            }
            "fix-colors" => {
                let changed = planner.fix_role_colors();
                if changed.is_empty() {
                    println!("Role colors are already unique.");
                } else {
                    println!("Recolored roles: {}", changed.join(", "));
                }
            }
            "save" => match (parts.next(), parts.next()) {
                (Some("json"), Some(path)) => match save_planner_to_json(&planner, path) {
                    Ok(_) => println!("Planner saved to {}.", path),
                    Err(e) => println!("Error saving planner: {}", e),
                },
                _ => println!("Usage: save json <path>"),
            },
            "load" => match (parts.next(), parts.next()) {
                (Some("json"), Some(path)) => match load_planner_from_json(path) {
                    Ok(loaded) => {
                        planner = loaded;
                        println!("Planner loaded from {}.", path);
                    }
                    Err(e) => println!("Error loading planner: {}", e),
                },
                _ => println!("Usage: load json <path>"),
            },
            "export" => {
                let result = match (parts.next(), parts.next()) {
                    (Some("persons"), Some(path)) => export_persons_csv(&planner, path).map(|_| path),
                    (Some("assignments"), Some(path)) => {
                        export_assignments_csv(&planner, path).map(|_| path)
                    }
                    _ => {
                        println!("Usage: export persons|assignments <path>");
                        continue;
                    }
                };
                match result {
                    Ok(path) => println!("Exported to {}.", path),
                    Err(e) => println!("Error exporting: {}", e),
                }
            }
            "import" => {
                let result = match (parts.next(), parts.next()) {
                    (Some("persons"), Some(path)) => import_persons_csv(&mut planner, path),
                    (Some("assignments"), Some(path)) => {
                        import_assignments_csv(&mut planner, path)
                    }
                    _ => {
                        println!("Usage: import persons|assignments <path>");
                        continue;
                    }
                };
                match result {
                    Ok(summary) => println!(
                        "Imported {} new, {} updated.",
                        summary.inserted, summary.updated
                    ),
                    Err(e) => println!("Error importing: {}", e),
                }
            }
            _ => println!("Unknown command. Type 'help'."),
        }
    }
}
