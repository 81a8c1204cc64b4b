//! GraphQL documents sent to the users API
//!
//! Variable names and selections match the backend schema one to one.

pub const CREATE_USER: &str = r#"
mutation CreateUser(
    $nome: String!,
    $email: String!,
    $cep: String!,
    $logradouro: String!,
    $bairro: String!,
    $cidade: String!,
    $estado: String!
) {
    createUser(
        nome: $nome,
        email: $email,
        cep: $cep,
        logradouro: $logradouro,
        bairro: $bairro,
        cidade: $cidade,
        estado: $estado
    ) {
        id
        nome
        email
        address {
            cep
            logradouro
            bairro
            cidade
            estado
        }
    }
}
"#;

pub const USERS_PAGINATED: &str = r#"
query UsersPaginated($page: Int!, $perPage: Int!) {
    usersPaginated(page: $page, perPage: $perPage) {
        items {
            id
            nome
            email
            address {
                cep
                logradouro
                bairro
                cidade
                estado
            }
        }
        page
        perPage
        total
        totalPages
    }
}
"#;

pub const USER_BY_ID: &str = r#"
query UserById($id: Int!) {
    userById(id: $id) {
        id
        nome
        email
        address {
            cep
            logradouro
            bairro
            cidade
            estado
        }
    }
}
"#;

pub const UPDATE_USER: &str = r#"
mutation UpdateUser($id: Int!, $nome: String!, $email: String!) {
    updateUser(id: $id, nome: $nome, email: $email) {
        id
        nome
        email
        address {
            cep
            logradouro
            bairro
            cidade
            estado
        }
    }
}
"#;

pub const DELETE_USER: &str = r#"
mutation DeleteUser($id: Int!) {
    deleteUser(id: $id) {
        id
        nome
        email
        address {
            cep
            logradouro
            bairro
            cidade
            estado
        }
    }
}
"#;

/// `data` field holding each operation's payload
pub const CREATE_USER_FIELD: &str = "createUser";
pub const USERS_PAGINATED_FIELD: &str = "usersPaginated";
pub const USER_BY_ID_FIELD: &str = "userById";
pub const UPDATE_USER_FIELD: &str = "updateUser";
pub const DELETE_USER_FIELD: &str = "deleteUser";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_user_declares_all_variables_required() {
        for var in ["nome", "email", "cep", "logradouro", "bairro", "cidade", "estado"] {
            assert!(
                CREATE_USER.contains(&format!("${var}: String!")),
                "missing required variable {var}"
            );
        }
    }

    #[test]
    fn test_documents_select_their_field() {
        let pairs = [
            (CREATE_USER, CREATE_USER_FIELD),
            (USERS_PAGINATED, USERS_PAGINATED_FIELD),
            (USER_BY_ID, USER_BY_ID_FIELD),
            (UPDATE_USER, UPDATE_USER_FIELD),
            (DELETE_USER, DELETE_USER_FIELD),
        ];
        for (document, field) in pairs {
            assert!(document.contains(&format!("{field}(")), "{field} not selected");
        }
    }

    #[test]
    fn test_pagination_variables_are_ints() {
        assert!(USERS_PAGINATED.contains("$page: Int!"));
        assert!(USERS_PAGINATED.contains("$perPage: Int!"));
    }
}
