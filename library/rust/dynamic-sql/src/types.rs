//! SQL type names.
//!
//! The rest of the crate speaks SQL Server type names (`uniqueidentifier`,
//! `int`, `nvarchar`, ...). Catalog rows reported by PostgreSQL are mapped
//! onto those names by [`normalize_data_type`].

/// Broad grouping of SQL types used for conversion and control whitelists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlTypeFamily {
    Guid,
    Integer,
    Decimal,
    Float,
    Bit,
    Date,
    DateTime,
    Character,
    LongText,
    Other,
}

/// Lower-cases a type name and strips any length / precision suffix.
///
/// `NVARCHAR(50)` -> `nvarchar`, `decimal(18, 2)` -> `decimal`.
pub fn base_type(sql_type: &str) -> String {
    let trimmed = sql_type.trim();
    let base = trimmed.split('(').next().unwrap_or(trimmed);
    base.trim().to_ascii_lowercase()
}

/// Classifies a SQL Server type name.
pub fn family(sql_type: &str) -> SqlTypeFamily {
    match base_type(sql_type).as_str() {
        "uniqueidentifier" => SqlTypeFamily::Guid,
        "int" | "bigint" | "smallint" | "tinyint" => SqlTypeFamily::Integer,
        "decimal" | "numeric" | "money" | "smallmoney" => SqlTypeFamily::Decimal,
        "float" | "real" => SqlTypeFamily::Float,
        "bit" => SqlTypeFamily::Bit,
        "date" => SqlTypeFamily::Date,
        "datetime" | "datetime2" | "smalldatetime" | "datetimeoffset" => SqlTypeFamily::DateTime,
        "char" | "nchar" | "varchar" | "nvarchar" => SqlTypeFamily::Character,
        "text" | "ntext" | "xml" => SqlTypeFamily::LongText,
        _ => SqlTypeFamily::Other,
    }
}

/// Maps a PostgreSQL `information_schema` data type onto its SQL Server name.
///
/// Names that are already SQL Server names pass through unchanged.
pub fn normalize_data_type(engine_type: &str) -> String {
    let base = base_type(engine_type);
    let mapped = match base.as_str() {
        "uuid" => "uniqueidentifier",
        "integer" | "int4" | "serial" => "int",
        "bigint" | "int8" | "bigserial" => "bigint",
        "smallint" | "int2" | "smallserial" => "smallint",
        "boolean" | "bool" => "bit",
        "real" | "float4" => "real",
        "double precision" | "float8" => "float",
        "character varying" | "varchar" => "varchar",
        "character" | "bpchar" => "char",
        "text" | "citext" => "nvarchar",
        "timestamp without time zone" | "timestamp" => "datetime2",
        "timestamp with time zone" | "timestamptz" => "datetimeoffset",
        "json" | "jsonb" => "nvarchar",
        other => other,
    };
    mapped.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_type_strips_length() {
        assert_eq!(base_type("NVARCHAR(50)"), "nvarchar");
        assert_eq!(base_type(" decimal(18, 2) "), "decimal");
        assert_eq!(base_type("int"), "int");
    }

    #[test]
    fn test_family_classification() {
        assert_eq!(family("uniqueidentifier"), SqlTypeFamily::Guid);
        assert_eq!(family("BIGINT"), SqlTypeFamily::Integer);
        assert_eq!(family("numeric(20,0)"), SqlTypeFamily::Decimal);
        assert_eq!(family("bit"), SqlTypeFamily::Bit);
        assert_eq!(family("datetime2"), SqlTypeFamily::DateTime);
        assert_eq!(family("nvarchar(max)"), SqlTypeFamily::Character);
        assert_eq!(family("geography"), SqlTypeFamily::Other);
    }

    #[test]
    fn test_normalize_postgres_types() {
        assert_eq!(normalize_data_type("uuid"), "uniqueidentifier");
        assert_eq!(normalize_data_type("integer"), "int");
        assert_eq!(normalize_data_type("character varying"), "varchar");
        assert_eq!(normalize_data_type("text"), "nvarchar");
        assert_eq!(normalize_data_type("boolean"), "bit");
        assert_eq!(normalize_data_type("numeric"), "numeric");
        assert_eq!(normalize_data_type("timestamp without time zone"), "datetime2");
        assert_eq!(normalize_data_type("date"), "date");
    }
}
