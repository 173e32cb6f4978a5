//! Built-in template bodies.
//!
//! Templates are stored as `(file_name, body)` pairs and registered with every
//! [`TemplateSource`](crate::TemplateSource). A file with the same name in the
//! override directory replaces the bundled body.
//!
//! Only postgres ships a `proc` template; other dialects need one in the
//! override directory before stored procedures can be generated.
//!
//! Every template sees the globals installed by [`Helpers`](crate::Helpers):
//! `package`, `dialect` and `single_file`.

/// Bundled templates, keyed by file name.
pub const BUNDLED_TEMPLATES: &[(&str, &str)] = &[
    ("xo_db.go.tpl", XO_DB_TEMPLATE),
    ("xo_table.go.tpl", XO_TABLE_TEMPLATE),
    ("xo_single_file.go.tpl", XO_SINGLE_FILE_TEMPLATE),
    // postgres
    ("postgres.type.go.tpl", TYPE_TEMPLATE),
    ("postgres.querytype.go.tpl", QUERY_TYPE_TEMPLATE),
    ("postgres.index.go.tpl", INDEX_TEMPLATE),
    ("postgres.foreignkey.go.tpl", FOREIGN_KEY_TEMPLATE),
    ("postgres.query.go.tpl", QUERY_TEMPLATE),
    ("postgres.enum.go.tpl", ENUM_TEMPLATE),
    ("postgres.proc.go.tpl", PROC_TEMPLATE),
    // mysql
    ("mysql.type.go.tpl", TYPE_TEMPLATE),
    ("mysql.querytype.go.tpl", QUERY_TYPE_TEMPLATE),
    ("mysql.index.go.tpl", INDEX_TEMPLATE),
    ("mysql.foreignkey.go.tpl", FOREIGN_KEY_TEMPLATE),
    ("mysql.query.go.tpl", QUERY_TEMPLATE),
    ("mysql.enum.go.tpl", ENUM_TEMPLATE),
    // sqlite3
    ("sqlite3.type.go.tpl", TYPE_TEMPLATE),
    ("sqlite3.querytype.go.tpl", QUERY_TYPE_TEMPLATE),
    ("sqlite3.index.go.tpl", INDEX_TEMPLATE),
    ("sqlite3.foreignkey.go.tpl", FOREIGN_KEY_TEMPLATE),
    ("sqlite3.query.go.tpl", QUERY_TEMPLATE),
    // oracle (also used by the `ora` and `oci8` loaders)
    ("oracle.type.go.tpl", TYPE_TEMPLATE),
    ("oracle.querytype.go.tpl", QUERY_TYPE_TEMPLATE),
    ("oracle.index.go.tpl", INDEX_TEMPLATE),
    ("oracle.foreignkey.go.tpl", FOREIGN_KEY_TEMPLATE),
    ("oracle.query.go.tpl", QUERY_TEMPLATE),
    // mssql
    ("mssql.type.go.tpl", TYPE_TEMPLATE),
    ("mssql.querytype.go.tpl", QUERY_TYPE_TEMPLATE),
    ("mssql.index.go.tpl", INDEX_TEMPLATE),
    ("mssql.foreignkey.go.tpl", FOREIGN_KEY_TEMPLATE),
    ("mssql.query.go.tpl", QUERY_TEMPLATE),
];

/// Shared boilerplate rendered once per run.
const XO_DB_TEMPLATE: &str = r#"{% if not single_file %}
// Package {{ package }} contains generated code for the {{ dialect }} schema.
package {{ package }}

{% endif %}
// XODB is the common interface for database operations that can be used
// with the types in package {{ package }}.
type XODB interface {
	Exec(string, ...interface{}) (sql.Result, error)
	Query(string, ...interface{}) (*sql.Rows, error)
	QueryRow(string, ...interface{}) *sql.Row
}

// XOLog provides the log func used by generated queries.
var XOLog = func(string, ...interface{}) {}
"#;

/// Per-entity primary template.
///
/// Template variables:
/// - `name`: entity name
/// - `templates`: associated sub-template kinds, in association order
/// - `dots`: map of kind to the contexts queued for it
const XO_TABLE_TEMPLATE: &str = r#"{% if not single_file %}
// Package {{ package }} contains the generated code for {{ name }}.
package {{ package }}
{% endif %}
{% for kind in templates %}
{% for dot in dots[kind] %}

{{ render_sub(kind, dot) }}
{% endfor %}
{% endfor %}
"#;

/// Aggregate template for single-file mode.
///
/// Template variables:
/// - `config`: the run configuration
/// - `generated`: boilerplate buffers (`kind`, `name`, `subname`, `content`)
/// - `entities`: entity views in registration order, each with its `buffer`
const XO_SINGLE_FILE_TEMPLATE: &str = r#"// Package {{ package }} contains generated code for the {{ dialect }} schema.
package {{ package }}
{% for gen in generated %}

{{ gen.content }}
{% endfor %}
{% for entity in entities %}

// {{ entity.name }}
{{ entity.buffer }}
{% endfor %}
"#;

/// Row type for a table or view.
///
/// Template variables: `name`, `table`, `fields` (`name`, `type`).
const TYPE_TEMPLATE: &str = r#"// {{ name | pascal_case }} represents a row from '{{ table }}'.
type {{ name | pascal_case }} struct {
{% for field in fields %}
	{{ field.name | pascal_case }} {{ field.type }} `json:"{{ field.name }}"`
{% endfor %}
}
"#;

/// Row type for a custom query.
///
/// Template variables: `name`, `fields` (`name`, `type`).
const QUERY_TYPE_TEMPLATE: &str = r#"// {{ name | pascal_case }} represents a row returned by a custom query.
type {{ name | pascal_case }} struct {
{% for field in fields %}
	{{ field.name | pascal_case }} {{ field.type }} `json:"{{ field.name }}"`
{% endfor %}
}
"#;

/// Lookup function generated from an index.
///
/// Template variables: `name`, `table`, `type_name`, `unique`, `fields`.
const INDEX_TEMPLATE: &str = r#"// {{ name | pascal_case }} retrieves {{ "a row" if unique else "rows" }} from '{{ table }}' as {{ ("a " ~ type_name) if unique else (type_name | plural) }}.
//
// Generated from index '{{ name }}'.
func {{ name | pascal_case }}(db XODB{% for field in fields %}, {{ field.name | camel_case }} {{ field.type }}{% endfor %}) ({{ "*" if unique else "[]*" }}{{ type_name }}, error) {
	const sqlstr = `SELECT * FROM {{ table }} WHERE {% for field in fields %}{{ " AND " if not loop.first else "" }}{{ field.name }} = {{ loop.index | placeholder }}{% endfor %}`

	XOLog(sqlstr{% for field in fields %}, {{ field.name | camel_case }}{% endfor %})
{% if unique %}
	var v {{ type_name }}
	if err := db.QueryRow(sqlstr{% for field in fields %}, {{ field.name | camel_case }}{% endfor %}).Scan(&v); err != nil {
		return nil, err
	}
	return &v, nil
{% else %}
	rows, err := db.Query(sqlstr{% for field in fields %}, {{ field.name | camel_case }}{% endfor %})
	if err != nil {
		return nil, err
	}
	defer rows.Close()

	var res []*{{ type_name }}
	for rows.Next() {
		var v {{ type_name }}
		if err = rows.Scan(&v); err != nil {
			return nil, err
		}
		res = append(res, &v)
	}
	return res, rows.Err()
{% endif %}
}
"#;

/// Accessor generated from a foreign key.
///
/// Template variables: `name`, `type_name`, `ref_type`, `field`, `ref_field`.
const FOREIGN_KEY_TEMPLATE: &str = r#"// {{ name | pascal_case }} returns the {{ ref_type }} associated with the {{ type_name }}'s {{ field | pascal_case }} ({{ field }}).
//
// Generated from foreign key '{{ name }}'.
func ({{ type_name | first | lower }} *{{ type_name }}) {{ name | pascal_case }}(db XODB) (*{{ ref_type }}, error) {
	return {{ ref_type }}By{{ ref_field | pascal_case }}(db, {{ type_name | first | lower }}.{{ field | pascal_case }})
}
"#;

/// Function wrapping a custom query.
///
/// Template variables: `name`, `type_name`, `sql`, `one`, `params` (`name`, `type`).
const QUERY_TEMPLATE: &str = r#"// {{ name | pascal_case }} runs a custom query, returning {{ "one result" if one else "results" }} as {{ type_name }}.
func {{ name | pascal_case }}(db XODB{% for param in params %}, {{ param.name | camel_case }} {{ param.type }}{% endfor %}) ({{ "*" if one else "[]*" }}{{ type_name }}, error) {
	const sqlstr = {{ sql | quote }}

	XOLog(sqlstr{% for param in params %}, {{ param.name | camel_case }}{% endfor %})
{% if one %}
	var v {{ type_name }}
	if err := db.QueryRow(sqlstr{% for param in params %}, {{ param.name | camel_case }}{% endfor %}).Scan(&v); err != nil {
		return nil, err
	}
	return &v, nil
{% else %}
	rows, err := db.Query(sqlstr{% for param in params %}, {{ param.name | camel_case }}{% endfor %})
	if err != nil {
		return nil, err
	}
	defer rows.Close()

	var res []*{{ type_name }}
	for rows.Next() {
		var v {{ type_name }}
		if err = rows.Scan(&v); err != nil {
			return nil, err
		}
		res = append(res, &v)
	}
	return res, rows.Err()
{% endif %}
}
"#;

/// Enum type with its String method.
///
/// Template variables: `name`, `values`.
const ENUM_TEMPLATE: &str = r#"// {{ name | pascal_case }} is the '{{ name }}' enum type.
type {{ name | pascal_case }} uint16

const (
{% for value in values %}
	// {{ name | pascal_case }}{{ value | pascal_case }} is the '{{ value }}' {{ name }}.
	{{ name | pascal_case }}{{ value | pascal_case }}{{ (" " ~ (name | pascal_case) ~ " = iota + 1") if loop.first else "" }}
{% endfor %}
)

// String returns the string value of the {{ name | pascal_case }}.
func (e {{ name | pascal_case }}) String() string {
	switch e {
{% for value in values %}
	case {{ name | pascal_case }}{{ value | pascal_case }}:
		return {{ value | quote }}
{% endfor %}
	}
	return ""
}
"#;

/// Wrapper calling a stored procedure.
///
/// Template variables: `name`, `proc_name`, `return_type`, `params` (`name`, `type`).
const PROC_TEMPLATE: &str = r#"// {{ name | pascal_case }} calls the stored procedure '{{ proc_name }}'.
func {{ name | pascal_case }}(db XODB{% for param in params %}, {{ param.name | camel_case }} {{ param.type }}{% endfor %}) ({{ return_type }}, error) {
	const sqlstr = `SELECT {{ proc_name }}({% for param in params %}{{ ", " if not loop.first else "" }}{{ loop.index | placeholder }}{% endfor %})`

	var ret {{ return_type }}
	XOLog(sqlstr{% for param in params %}, {{ param.name | camel_case }}{% endfor %})
	if err := db.QueryRow(sqlstr{% for param in params %}, {{ param.name | camel_case }}{% endfor %}).Scan(&ret); err != nil {
		return ret, err
	}
	return ret, nil
}
"#;
