pub mod ast;
pub mod compile;
pub mod filter;
pub mod include;
pub mod paging;
pub mod projection;
pub mod sort;

pub use ast::{QueryRequest, SortDirection};
pub use compile::{check_filter, compile_query, CompiledQuery};
pub use filter::{
    BinaryNode, BinaryOp, CallNode, CallOp, FieldNode, FilterNode, GroupNode, LiteralNode,
    LiteralType, OperatorClass, UnaryNode, UnaryOp,
};
pub use include::IncludeSet;
pub use paging::{PageRequest, PageResult};
pub use projection::{project_many, project_one, select_fields, ProjectionEntry, ProjectionTree};
pub use sort::{SortKey, SortPlan};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use pretty_assertions::assert_eq;

    // ─── REQUEST ───

    #[test]
    fn test_request_from_query_json() {
        let request: QueryRequest = serde_json::from_str(
            r#"{"filter":"isActive == true","pageSize":25,"include":"company"}"#,
        )
        .unwrap();
        assert_eq!(
            request,
            QueryRequest::new()
                .filter("isActive == true")
                .page_size(25)
                .include("company")
        );
        assert_eq!(request.page, None);
    }

    #[test]
    fn test_request_builder() {
        let request = QueryRequest::new().sort("-createdAt").page(2).fields("name");
        assert_eq!(request.sort.as_deref(), Some("-createdAt"));
        assert_eq!(request.page, Some(2));
        assert_eq!(request.fields.as_deref(), Some("name"));
        assert!(request.filter.is_none());
    }

    // ─── OPERATOR MATRIX ───

    #[test]
    fn test_operator_classes() {
        assert!(OperatorClass::StringOnly.permits(FieldType::String));
        assert!(!OperatorClass::StringOnly.permits(FieldType::Guid));
        assert!(OperatorClass::Ordering.permits(FieldType::DateTime));
        assert!(!OperatorClass::Ordering.permits(FieldType::Boolean));
        assert!(OperatorClass::Any.permits(FieldType::Boolean));
    }

    #[test]
    fn test_operators_for_type() {
        assert_eq!(
            filter::operators_for(FieldType::Boolean),
            vec!["==", "!=", "in", "not in", "is null", "is not null"]
        );
        assert!(filter::operators_for(FieldType::Number).contains(&"between"));
    }

    // ─── AST ───

    #[test]
    fn test_depth_and_cost() {
        let leaf = FilterNode::binary(
            BinaryOp::Eq,
            FilterNode::field("a"),
            FilterNode::literal("1", LiteralType::Number),
        );
        assert_eq!(leaf.depth(), 1);

        let grouped = FilterNode::unary(UnaryOp::Not, FilterNode::group(FilterNode::group(leaf)));
        assert_eq!(grouped.depth(), 3);
        assert_eq!(grouped.cost(), 4);
        assert_eq!(grouped.referenced_fields(), vec!["a"]);
        assert_eq!(grouped.to_string(), "not ((a == 1))");
    }

    #[test]
    fn test_ast_serializes_with_kind_tag() {
        let node = FilterNode::call(CallOp::IsNull, FilterNode::field("serialNumber"), vec![]);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["kind"], "call");
        assert_eq!(json["operator"], "IsNull");
        assert_eq!(json["target"]["kind"], "field");
    }
}
