//! Variable commands: text variables, globals, lists and objects.

use async_trait::async_trait;
use neet_types::{CommandSchema, Style, Variable, VariableKind};

use super::{arg, parse_integer, rest};
use crate::commands::{Command, CommandError, CommandResult, LineContext};
use crate::interpreter::validate_name;

/// Set a text variable in the active scope.
pub struct Var;

#[async_trait]
impl Command for Var {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("var", "Sets a variable's value.")
            .alias("let")
            .param("name", "Variable name")
            .param("value", "Value of the variable")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let name = ctx.interpolate(arg(&args, 0));
        let value = ctx.interpolate(&rest(&args, 1));
        if name.is_empty() || value.is_empty() {
            return Err(CommandError::Usage);
        }
        ctx.assign(&name, Variable::Text(value))?;
        Ok(())
    }
}

/// Delete a variable from the active scope.
pub struct DeleteVar;

#[async_trait]
impl Command for DeleteVar {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("deletevar", "Deletes a variable.")
            .alias("delvar")
            .alias("rmvar")
            .alias("removevar")
            .param("name", "Variable name")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let name = ctx.interpolate(arg(&args, 0));
        if name.is_empty() {
            return Err(CommandError::Usage);
        }
        validate_name(&name)?;
        ctx.remove(&name);
        Ok(())
    }
}

/// Set a text variable in the global scope.
pub struct Glob;

#[async_trait]
impl Command for Glob {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("glob", "Sets a global variable's value.")
            .alias("global")
            .param("name", "Variable name")
            .param("value", "Value of the variable")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let name = ctx.interpolate(arg(&args, 0));
        let value = ctx.interpolate(&rest(&args, 1));
        if name.is_empty() || value.is_empty() {
            return Err(CommandError::Usage);
        }
        ctx.assign_global(&name, Variable::Text(value))?;
        Ok(())
    }
}

/// Delete a global variable.
pub struct DeleteGlob;

#[async_trait]
impl Command for DeleteGlob {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("deleteglob", "Deletes a global variable.")
            .alias("delglob")
            .alias("rmglob")
            .alias("removeglob")
            .alias("deleteglobal")
            .alias("delglobal")
            .alias("rmglobal")
            .alias("removeglobal")
            .param("name", "Variable name")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let name = ctx.interpolate(arg(&args, 0));
        if name.is_empty() {
            return Err(CommandError::Usage);
        }
        validate_name(&name)?;
        ctx.remove_global(&name);
        Ok(())
    }
}

/// Report a variable's tag.
pub struct VarType;

#[async_trait]
impl Command for VarType {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("vartype", "Returns the type of the variable.")
            .alias("variabletype")
            .param("name", "The name of the variable to check.")
            .returns("'string' or 'list' or 'object' or if it doesn't exist 'undefined'")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let name = ctx.interpolate(arg(&args, 0));
        if name.is_empty() {
            return Err(CommandError::Usage);
        }
        let kind = ctx
            .variable(&name)
            .map(|v| v.kind().script_name())
            .unwrap_or("undefined");
        ctx.respond(kind, Style::plain());
        Ok(())
    }
}

fn wrong_kind(name: &str, expected: VariableKind) -> CommandError {
    let article = match expected {
        VariableKind::Map => "an",
        VariableKind::Text | VariableKind::List => "a",
    };
    CommandError::failed(format!("'{}' is not {} {} variable.", name, article, expected))
}

fn list(ctx: &dyn LineContext, name: &str) -> Result<Vec<String>, CommandError> {
    match ctx.variable(name) {
        Some(Variable::List(items)) => Ok(items),
        Some(_) => Err(wrong_kind(name, VariableKind::List)),
        None => Err(CommandError::failed(format!("Variable not found: {}", name))),
    }
}

fn object(
    ctx: &dyn LineContext,
    name: &str,
) -> Result<std::collections::BTreeMap<String, String>, CommandError> {
    match ctx.variable(name) {
        Some(Variable::Map(map)) => Ok(map),
        Some(_) => Err(wrong_kind(name, VariableKind::Map)),
        None => Err(CommandError::failed(format!("Variable not found: {}", name))),
    }
}

/// Create an empty list.
pub struct ListCreate;

#[async_trait]
impl Command for ListCreate {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("listcreate", "Creates a list variable.")
            .param("name", "The name of the list variable.")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let name = ctx.interpolate(arg(&args, 0));
        if name.is_empty() {
            return Err(CommandError::Usage);
        }
        ctx.assign(&name, Variable::empty_list())?;
        Ok(())
    }
}

/// Append to a list.
pub struct ListAdd;

#[async_trait]
impl Command for ListAdd {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("listadd", "Adds a value to the end of a list.")
            .param("name", "The name of the list variable.")
            .param("value", "The value to add.")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let name = ctx.interpolate(arg(&args, 0));
        let value = ctx.interpolate(&rest(&args, 1));
        if name.is_empty() || args.len() < 2 {
            return Err(CommandError::Usage);
        }
        let mut items = list(ctx, &name)?;
        items.push(value);
        ctx.update(&name, Variable::List(items))?;
        Ok(())
    }
}

/// Read a list item by 0-based index.
pub struct ListGet;

#[async_trait]
impl Command for ListGet {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("listget", "Gets the value at an index of a list.")
            .param("name", "The name of the list variable.")
            .param("index", "The index, starting from 0.")
            .returns("string")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let name = ctx.interpolate(arg(&args, 0));
        let index = parse_integer(&ctx.interpolate(arg(&args, 1)));
        let index = match index {
            Some(index) if !name.is_empty() => index,
            _ => return Err(CommandError::Usage),
        };
        let items = list(ctx, &name)?;
        let item = usize::try_from(index)
            .ok()
            .and_then(|i| items.get(i))
            .ok_or_else(|| CommandError::failed(format!("Index out of range: {}", index)))?;
        ctx.respond(item, Style::plain());
        Ok(())
    }
}

/// Report a list's length.
pub struct ListLength;

#[async_trait]
impl Command for ListLength {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("listlength", "Returns the number of values in a list.")
            .param("name", "The name of the list variable.")
            .returns("integer")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let name = ctx.interpolate(arg(&args, 0));
        if name.is_empty() {
            return Err(CommandError::Usage);
        }
        let items = list(ctx, &name)?;
        ctx.respond(&items.len().to_string(), Style::plain());
        Ok(())
    }
}

/// Create an empty object.
pub struct ObjCreate;

#[async_trait]
impl Command for ObjCreate {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("objcreate", "Creates an object variable.")
            .param("name", "The name of the object variable.")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let name = ctx.interpolate(arg(&args, 0));
        if name.is_empty() {
            return Err(CommandError::Usage);
        }
        ctx.assign(&name, Variable::empty_map())?;
        Ok(())
    }
}

/// Set a key of an object.
pub struct ObjSet;

#[async_trait]
impl Command for ObjSet {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("objset", "Sets a key of an object.")
            .param("name", "The name of the object variable.")
            .param("key", "The key.")
            .param("value", "The value.")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let name = ctx.interpolate(arg(&args, 0));
        let key = ctx.interpolate(arg(&args, 1));
        let value = ctx.interpolate(&rest(&args, 2));
        if name.is_empty() || key.is_empty() {
            return Err(CommandError::Usage);
        }
        let mut map = object(ctx, &name)?;
        map.insert(key, value);
        ctx.update(&name, Variable::Map(map))?;
        Ok(())
    }
}

/// Read a key of an object.
pub struct ObjGet;

#[async_trait]
impl Command for ObjGet {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("objget", "Gets the value of a key of an object.")
            .param("name", "The name of the object variable.")
            .param("key", "The key.")
            .returns("string")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let name = ctx.interpolate(arg(&args, 0));
        let key = ctx.interpolate(arg(&args, 1));
        if name.is_empty() || key.is_empty() {
            return Err(CommandError::Usage);
        }
        let map = object(ctx, &name)?;
        let value = map
            .get(&key)
            .ok_or_else(|| CommandError::failed(format!("Key not found: {}", key)))?;
        ctx.respond(value, Style::plain());
        Ok(())
    }
}

/// List an object's keys, one response per key.
pub struct ObjKeys;

#[async_trait]
impl Command for ObjKeys {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("objkeys", "Returns the keys of an object.")
            .param("name", "The name of the object variable.")
            .returns("The keys, one per line")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let name = ctx.interpolate(arg(&args, 0));
        if name.is_empty() {
            return Err(CommandError::Usage);
        }
        for key in object(ctx, &name)?.keys() {
            ctx.respond(key, Style::plain());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingContext;

    fn words(line: &str) -> Vec<String> {
        line.split(' ').map(String::from).collect()
    }

    #[tokio::test]
    async fn var_writes_active_scope() {
        let mut script = RecordingContext::in_script("s", &["var x 1"]);
        Var.execute(words("x hello there"), &mut script).await.unwrap();
        assert_eq!(script.locals.get("x"), Some(&Variable::text("hello there")));
        assert!(script.globals.is_empty());

        let mut bare = RecordingContext::bare();
        Var.execute(words("x 1"), &mut bare).await.unwrap();
        assert_eq!(bare.globals.get("x"), Some(&Variable::text("1")));
    }

    #[tokio::test]
    async fn var_needs_name_and_value() {
        let mut ctx = RecordingContext::bare();
        assert_eq!(Var.execute(words("x"), &mut ctx).await, Err(CommandError::Usage));
        let err = Var.execute(words("1x v"), &mut ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "Variable names cannot start with numbers.");
    }

    #[tokio::test]
    async fn var_refuses_tag_change() {
        let mut ctx = RecordingContext::bare();
        ListCreate.execute(words("x"), &mut ctx).await.unwrap();
        let err = Var.execute(words("x text"), &mut ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "Variable already exists with a different type.");
        assert_eq!(ctx.globals.get("x"), Some(&Variable::empty_list()));
    }

    #[tokio::test]
    async fn glob_writes_global_from_script() {
        let mut ctx = RecordingContext::in_script("s", &["glob g 1"]);
        Glob.execute(words("g 1"), &mut ctx).await.unwrap();
        assert_eq!(ctx.globals.get("g"), Some(&Variable::text("1")));
        assert!(ctx.locals.is_empty());

        DeleteGlob.execute(words("g"), &mut ctx).await.unwrap();
        assert!(ctx.globals.is_empty());
    }

    #[tokio::test]
    async fn deletevar_validates_name() {
        let mut ctx = RecordingContext::bare();
        Var.execute(words("x 1"), &mut ctx).await.unwrap();
        DeleteVar.execute(words("x"), &mut ctx).await.unwrap();
        assert!(ctx.globals.is_empty());
        assert!(DeleteVar.execute(words("9"), &mut ctx).await.is_err());
    }

    #[tokio::test]
    async fn vartype_reports_kinds() {
        let mut ctx = RecordingContext::bare();
        Var.execute(words("s v"), &mut ctx).await.unwrap();
        ObjCreate.execute(words("o"), &mut ctx).await.unwrap();
        for name in ["s", "o", "none"] {
            VarType.execute(vec![name.to_string()], &mut ctx).await.unwrap();
        }
        assert_eq!(ctx.responses, vec!["string", "object", "undefined"]);
    }

    #[tokio::test]
    async fn list_operations() {
        let mut ctx = RecordingContext::bare();
        ListCreate.execute(words("l"), &mut ctx).await.unwrap();
        ListAdd.execute(words("l first"), &mut ctx).await.unwrap();
        ListAdd.execute(words("l second item"), &mut ctx).await.unwrap();
        ListLength.execute(words("l"), &mut ctx).await.unwrap();
        ListGet.execute(words("l 1"), &mut ctx).await.unwrap();
        assert_eq!(ctx.responses, vec!["2", "second item"]);

        let err = ListGet.execute(words("l 5"), &mut ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "Index out of range: 5");
    }

    #[tokio::test]
    async fn list_ops_check_kind() {
        let mut ctx = RecordingContext::bare();
        Var.execute(words("t text"), &mut ctx).await.unwrap();
        let err = ListAdd.execute(words("t x"), &mut ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "'t' is not a list variable.");
        let err = ListLength.execute(words("missing"), &mut ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "Variable not found: missing");
    }

    #[tokio::test]
    async fn list_add_updates_global_list_from_script() {
        let mut ctx = RecordingContext::in_script("s", &["listadd shared x"]);
        ctx.globals.assign("shared", Variable::empty_list()).unwrap();
        ListAdd.execute(words("shared x"), &mut ctx).await.unwrap();
        assert_eq!(ctx.globals.get("shared"), Some(&Variable::List(vec!["x".into()])));
        assert!(ctx.locals.is_empty());
    }

    #[tokio::test]
    async fn object_operations() {
        let mut ctx = RecordingContext::bare();
        ObjCreate.execute(words("o"), &mut ctx).await.unwrap();
        ObjSet.execute(words("o b two words"), &mut ctx).await.unwrap();
        ObjSet.execute(words("o a 1"), &mut ctx).await.unwrap();
        ObjGet.execute(words("o b"), &mut ctx).await.unwrap();
        ObjKeys.execute(words("o"), &mut ctx).await.unwrap();
        assert_eq!(ctx.responses, vec!["two words", "a", "b"]);

        let err = ObjGet.execute(words("o zzz"), &mut ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "Key not found: zzz");
    }
}
