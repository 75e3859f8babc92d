pub fn is_help_request(args: &[String]) -> bool {
    matches!(
        args.first().map(String::as_str),
        Some("help" | "-h" | "--help")
    )
}

pub fn print_help() {
    println!("duckconn_cli - run queries against a DuckDB database");
    println!();
    println!("usage:");
    println!("  duckconn_cli query <db_path> <sql> [param ...]");
    println!("  duckconn_cli schema <db_path> <table_name>");
    println!("  duckconn_cli demo [db_path]");
    println!("  duckconn_cli help");
    println!();
    println!("<db_path> is a database file or :memory:");
    println!("params bind as numbers, true/false or null when they look like one;");
    println!("prefix with str: to bind as text (str:007)");
    println!("DUCKCONN_READ_ONLY, DUCKCONN_THREADS and DUCKCONN_MAX_MEMORY apply to every command");
    println!();
    println!("example:");
    println!("  duckconn_cli query ./app.duckdb \"SELECT * FROM test WHERE id = ?\" 1");
}
